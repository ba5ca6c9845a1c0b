// ==========================================
// 出库单自动指派系统 - 库存移动实体
// ==========================================

use crate::domain::types::MoveState;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 库存移动
///
/// 台账条目：某产品数量从一个库位移动到另一个库位。
/// DONE 的入库移动构成库存事实，DRAFT 的出库移动构成未分配需求，
/// ASSIGNED 的出库移动视作已预留。
/// updated_at 即写时间戳，清扫按它过滤“新到货”。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMove {
    /// 移动 ID
    pub move_id: String,

    /// 所属出库单（台账内部移动无所属单据）
    pub shipment_id: Option<String>,

    /// 产品 ID
    pub product_id: String,

    /// 源库位
    pub from_location_id: String,

    /// 目标库位
    pub to_location_id: String,

    /// 数量
    pub quantity: f64,

    /// 状态
    pub state: MoveState,

    /// 创建时间
    pub created_at: NaiveDateTime,

    /// 最近修改时间
    pub updated_at: NaiveDateTime,
}
