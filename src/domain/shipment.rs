// ==========================================
// 出库单自动指派系统 - 出库单实体
// ==========================================

use crate::domain::types::ShipmentState;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 出库单
///
/// 由若干库存移动（需求行）组成的对外发货记录。
/// 本模块只读取出库单并触发 wait / assign_try 两类状态操作。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentOut {
    /// 出库单 ID
    pub shipment_id: String,

    /// 出库单号
    pub number: String,

    /// 所属仓库（location 表中 WAREHOUSE 类型节点）
    pub warehouse_id: String,

    /// 客户收货库位
    pub customer_location_id: Option<String>,

    /// 生命周期状态
    pub state: ShipmentState,

    /// 创建时间
    pub created_at: NaiveDateTime,

    /// 最近修改时间
    pub updated_at: NaiveDateTime,
}

impl ShipmentOut {
    /// 是否处于等待库存状态
    pub fn is_waiting(&self) -> bool {
        self.state == ShipmentState::Waiting
    }
}
