// ==========================================
// 出库单自动指派系统 - 库位实体
// ==========================================

use crate::domain::types::LocationType;
use serde::{Deserialize, Serialize};

/// 出库暂存区的库位编码
///
/// 该库位虽然类型为 STORAGE，但存放的是待发货物，
/// 既不参与“新到货检测”，也不参与可用量计算。
pub const OUTPUT_STAGING_CODE: &str = "OUT";

/// 库位
///
/// 层级结构中的一个节点：仓库为顶层分组，存储区/客户点/供应商点挂在其下。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// 库位 ID
    pub location_id: String,

    /// 库位编码（如 "OUT"、"STO"）
    pub code: Option<String>,

    /// 库位名称
    pub name: String,

    /// 库位类型
    pub location_type: LocationType,

    /// 上级库位 ID
    pub parent_id: Option<String>,

    /// 是否启用
    pub active: bool,
}

impl Location {
    /// 是否为可拣选的普通存储区（排除出库暂存区）
    pub fn is_pickable_storage(&self) -> bool {
        self.location_type == LocationType::Storage
            && self.code.as_deref() != Some(OUTPUT_STAGING_CODE)
    }
}
