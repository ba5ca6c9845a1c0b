// ==========================================
// 出库单自动指派系统 - 出库单 API
// ==========================================
// 职责: 出库单状态操作入口 (wait / assign_try)
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::shipment::ShipmentOut;
use crate::domain::types::ShipmentState;
use crate::repository::ShipmentRepository;
use crate::services::assign::AssignService;
use chrono::NaiveDateTime;
use std::sync::Arc;

/// 出库单 API
pub struct ShipmentApi {
    shipment_repo: Arc<ShipmentRepository>,
    assign: Arc<AssignService>,
}

impl ShipmentApi {
    pub fn new(shipment_repo: Arc<ShipmentRepository>, assign: Arc<AssignService>) -> Self {
        Self {
            shipment_repo,
            assign,
        }
    }

    /// 将一批出库单转入 WAITING，并对"转换前为 DRAFT"的子集立即重试指派
    ///
    /// 已处于 WAITING / ASSIGNED 的单据允许再次 wait（撤销指派重新等待），
    /// 但只有草稿单会被自动送入 assign_try。
    ///
    /// # 参数
    /// - shipment_ids: 待转换的出库单 ID 集合
    /// - now: 状态写入使用的时间戳
    pub fn wait(&self, shipment_ids: &[String], now: NaiveDateTime) -> ApiResult<()> {
        if shipment_ids.is_empty() {
            return Ok(());
        }

        let shipments = self.shipment_repo.find_by_ids(shipment_ids)?;
        if shipments.len() != shipment_ids.len() {
            let found: Vec<&str> = shipments.iter().map(|s| s.shipment_id.as_str()).collect();
            let missing = shipment_ids
                .iter()
                .find(|id| !found.contains(&id.as_str()))
                .cloned()
                .unwrap_or_default();
            return Err(ApiError::NotFound(format!(
                "shipment_out(id={})不存在",
                missing
            )));
        }

        for shipment in &shipments {
            if !shipment.state.can_wait() {
                return Err(ApiError::InvalidStateTransition {
                    from: shipment.state.to_string(),
                    to: ShipmentState::Waiting.to_string(),
                });
            }
        }

        // 转换前记录草稿子集——只有这部分会被自动尝试指派
        let forward_ids: Vec<String> = shipments
            .iter()
            .filter(|s| s.state == ShipmentState::Draft)
            .map(|s| s.shipment_id.clone())
            .collect();

        let ids: Vec<String> = shipments.iter().map(|s| s.shipment_id.clone()).collect();
        self.shipment_repo
            .update_states(&ids, ShipmentState::Waiting, now)?;

        self.assign.assign_try(&forward_ids, now)?;
        Ok(())
    }

    /// 对一批出库单重试指派
    ///
    /// # 返回
    /// - Ok(Vec<String>): 完整指派成功的出库单 ID
    pub fn assign_try(
        &self,
        shipment_ids: &[String],
        now: NaiveDateTime,
    ) -> ApiResult<Vec<String>> {
        Ok(self.assign.assign_try(shipment_ids, now)?)
    }

    /// 按 ID 查询出库单
    pub fn get(&self, shipment_id: &str) -> ApiResult<ShipmentOut> {
        self.shipment_repo
            .find_by_id(shipment_id)?
            .ok_or_else(|| ApiError::NotFound(format!("shipment_out(id={})不存在", shipment_id)))
    }

    /// 查询等待库存的出库单
    pub fn list_waiting(
        &self,
        warehouse_id: Option<&str>,
        created_after: Option<NaiveDateTime>,
    ) -> ApiResult<Vec<ShipmentOut>> {
        Ok(self.shipment_repo.find_waiting(warehouse_id, created_after)?)
    }
}
