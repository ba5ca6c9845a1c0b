// ==========================================
// 出库单自动指派系统 - 产品实体
// ==========================================

use serde::{Deserialize, Serialize};

/// 产品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// 产品 ID
    pub product_id: String,

    /// 产品编码
    pub code: String,

    /// 产品名称
    pub name: String,
}
