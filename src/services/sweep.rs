// ==========================================
// 出库单自动指派系统 - 定时指派清扫服务
// ==========================================
// 职责: 找出"因新到货而可能满足"的等待出库单并重试指派
// ==========================================

use crate::db::ASSIGN_TRY_CRON_TASK_ID;
use crate::domain::location::OUTPUT_STAGING_CODE;
use crate::domain::types::LocationType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{
    CronTaskRepository, LocationRepository, ShipmentRepository, StockMoveRepository,
};
use crate::services::assign::AssignService;
use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 定时指派清扫服务
///
/// 回看窗口由自身的 cron 条目推导（next_call - interval），
/// 与实际执行时刻无关，延迟执行也能覆盖整个间隔。
pub struct AssignSweepService {
    cron_repo: Arc<CronTaskRepository>,
    location_repo: Arc<LocationRepository>,
    move_repo: Arc<StockMoveRepository>,
    shipment_repo: Arc<ShipmentRepository>,
    assign: Arc<AssignService>,
}

impl AssignSweepService {
    pub fn new(
        cron_repo: Arc<CronTaskRepository>,
        location_repo: Arc<LocationRepository>,
        move_repo: Arc<StockMoveRepository>,
        shipment_repo: Arc<ShipmentRepository>,
        assign: Arc<AssignService>,
    ) -> Self {
        Self {
            cron_repo,
            location_repo,
            move_repo,
            shipment_repo,
            assign,
        }
    }

    /// 执行一次清扫
    ///
    /// 步骤:
    /// 1. 读取自身 cron 条目，推导回看窗口起点
    /// 2. 找出窗口内有 DONE 入库的产品（目标为普通存储区，排除 "OUT"）
    /// 3. 找出这些产品流向客户库位的草稿需求
    /// 4. 收集其所属、当前处于 WAITING 的出库单
    /// 5. 候选非空且带仓库名过滤时，解析名称并收窄候选
    /// 6. 对候选执行 assign_try
    ///
    /// # 参数
    /// - warehouse_names: 可选的仓库名称过滤
    /// - now: 状态写入使用的时间戳
    ///
    /// # 返回
    /// - Ok(Vec<String>): 完整指派成功的出库单 ID
    pub fn run(
        &self,
        warehouse_names: Option<&[String]>,
        now: NaiveDateTime,
    ) -> RepositoryResult<Vec<String>> {
        let cron = self
            .cron_repo
            .find_by_id(ASSIGN_TRY_CRON_TASK_ID)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "cron_task".to_string(),
                id: ASSIGN_TRY_CRON_TASK_ID.to_string(),
            })?;
        let from_date = cron.lookback_start();

        let storage_ids: Vec<String> = self
            .location_repo
            .find_storage_excluding(OUTPUT_STAGING_CODE)?
            .into_iter()
            .map(|l| l.location_id)
            .collect();

        let arrived_products = self
            .move_repo
            .products_arrived_since(from_date, &storage_ids)?;
        if arrived_products.is_empty() {
            // 没有新到货: 候选集为空，仓库名解析一并省去
            tracing::info!("清扫结束: 自 {} 起无新到货", from_date);
            return Ok(Vec::new());
        }

        let customer_ids: Vec<String> = self
            .location_repo
            .find_by_type(LocationType::Customer)?
            .into_iter()
            .map(|l| l.location_id)
            .collect();

        let demand_moves = self
            .move_repo
            .find_draft_demand(&arrived_products, &customer_ids)?;

        // 去重并确认出库单当前仍在等待
        let shipment_ids: Vec<String> = demand_moves
            .into_iter()
            .filter_map(|m| m.shipment_id)
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();
        let mut candidates: Vec<String> = self
            .shipment_repo
            .find_by_ids(&shipment_ids)?
            .into_iter()
            .filter(|s| s.is_waiting())
            .map(|s| s.shipment_id)
            .collect();

        if !candidates.is_empty() {
            if let Some(names) = warehouse_names.filter(|n| !n.is_empty()) {
                let warehouse_ids: BTreeSet<String> = self
                    .location_repo
                    .find_by_names(names)?
                    .into_iter()
                    .map(|l| l.location_id)
                    .collect();
                let by_id = self.shipment_repo.find_by_ids(&candidates)?;
                candidates = by_id
                    .into_iter()
                    .filter(|s| warehouse_ids.contains(&s.warehouse_id))
                    .map(|s| s.shipment_id)
                    .collect();
            }
        }

        let assigned = self.assign.assign_try(&candidates, now)?;
        tracing::info!(
            "清扫结束: 新到货产品 {} 种, 候选 {} 单, 指派成功 {} 单",
            arrived_products.len(),
            candidates.len(),
            assigned.len()
        );
        Ok(assigned)
    }
}
