// ==========================================
// 出库单自动指派系统 - 指派服务 (assign_try)
// ==========================================
// 职责: 在单个事务内为一批出库单尝试预留库存
// 说明: 事务内直接使用 SQL（可用量聚合 + 状态写入），
//       规划决策委托给 AllocationPlanner
// ==========================================

use crate::domain::location::OUTPUT_STAGING_CODE;
use crate::engine::assign::{AllocationPlanner, MoveDemand};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, sql_placeholders};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 指派服务
///
/// 库存可用量定义：普通存储区（STORAGE 且编码非 "OUT"）的
/// DONE 入库量减去 DONE/ASSIGNED 出库量；ASSIGNED 计为已预留。
pub struct AssignService {
    conn: Arc<Mutex<Connection>>,
}

impl AssignService {
    /// 从共享连接创建服务实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 为一批出库单尝试预留库存
    ///
    /// 整批在一个事务内执行：批内先指派的单据占用的库存
    /// 对后续单据立即不可见。非 WAITING 的单据被静默跳过；
    /// 库存不足是正常的否定结果，不产生错误。
    ///
    /// # 参数
    /// - shipment_ids: 待尝试的出库单 ID 集合
    /// - now: 状态写入使用的时间戳
    ///
    /// # 返回
    /// - Ok(Vec<String>): 完整指派成功的出库单 ID
    /// - Err: 存储层错误（整批回滚）
    pub fn assign_try(
        &self,
        shipment_ids: &[String],
        now: NaiveDateTime,
    ) -> RepositoryResult<Vec<String>> {
        if shipment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let storage_ids = Self::pickable_storage_ids(&tx)?;

        let mut assigned = Vec::new();
        for shipment_id in shipment_ids {
            if Self::try_assign_one(&tx, shipment_id, &storage_ids, now)? {
                assigned.push(shipment_id.clone());
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tracing::info!(
            "assign_try 完成: 尝试 {} 单, 成功 {} 单",
            shipment_ids.len(),
            assigned.len()
        );
        Ok(assigned)
    }

    /// 可拣选存储区库位 ID（排除出库暂存区）
    fn pickable_storage_ids(tx: &Transaction<'_>) -> RepositoryResult<Vec<String>> {
        let mut stmt = tx.prepare(
            r#"
            SELECT location_id
            FROM location
            WHERE location_type = 'STORAGE'
              AND active = 1
              AND (code IS NULL OR code <> ?1)
            "#,
        )?;
        let ids = stmt
            .query_map(params![OUTPUT_STAGING_CODE], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// 对单张出库单执行预留
    ///
    /// # 返回
    /// - Ok(true): 出库单已完整指派（状态置为 ASSIGNED）
    /// - Ok(false): 未完整指派（可能部分行已预留，单据保持 WAITING）
    fn try_assign_one(
        tx: &Transaction<'_>,
        shipment_id: &str,
        storage_ids: &[String],
        now: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let state: Option<String> = tx
            .query_row(
                "SELECT state FROM shipment_out WHERE shipment_id = ?1",
                params![shipment_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(state) = state else {
            return Err(RepositoryError::NotFound {
                entity: "shipment_out".to_string(),
                id: shipment_id.to_string(),
            });
        };
        if state != "WAITING" {
            tracing::debug!("跳过非等待状态出库单: {} (state={})", shipment_id, state);
            return Ok(false);
        }

        // 需求行: 草稿状态的移动，按创建顺序
        let demands = Self::load_draft_demands(tx, shipment_id)?;

        // 可用量: 每个产品在事务内即时聚合
        let mut availability: HashMap<String, f64> = HashMap::new();
        for demand in &demands {
            if !availability.contains_key(&demand.product_id) {
                let available =
                    Self::available_quantity(tx, &demand.product_id, storage_ids)?;
                availability.insert(demand.product_id.clone(), available);
            }
        }

        let plan = AllocationPlanner::plan(&demands, &availability);
        for move_id in &plan.assignable_move_ids {
            tx.execute(
                "UPDATE stock_move SET state = 'ASSIGNED', updated_at = ?2 WHERE move_id = ?1",
                params![move_id, format_datetime(now)],
            )?;
        }

        // 无残留草稿行即为完整指派
        let remaining_drafts: i64 = tx.query_row(
            "SELECT COUNT(*) FROM stock_move WHERE shipment_id = ?1 AND state = 'DRAFT'",
            params![shipment_id],
            |row| row.get(0),
        )?;
        if remaining_drafts == 0 {
            tx.execute(
                "UPDATE shipment_out SET state = 'ASSIGNED', updated_at = ?2 WHERE shipment_id = ?1",
                params![shipment_id, format_datetime(now)],
            )?;
            tracing::debug!("出库单 {} 完整指派", shipment_id);
            Ok(true)
        } else {
            tracing::debug!(
                "出库单 {} 未完整指派: 残留草稿行 {}",
                shipment_id,
                remaining_drafts
            );
            Ok(false)
        }
    }

    fn load_draft_demands(
        tx: &Transaction<'_>,
        shipment_id: &str,
    ) -> RepositoryResult<Vec<MoveDemand>> {
        let mut stmt = tx.prepare(
            r#"
            SELECT move_id, product_id, quantity
            FROM stock_move
            WHERE shipment_id = ?1 AND state = 'DRAFT'
            ORDER BY created_at, move_id
            "#,
        )?;
        let demands = stmt
            .query_map(params![shipment_id], |row| {
                Ok(MoveDemand {
                    move_id: row.get(0)?,
                    product_id: row.get(1)?,
                    quantity: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<MoveDemand>>>()?;
        Ok(demands)
    }

    /// 产品在普通存储区的可用量
    fn available_quantity(
        tx: &Transaction<'_>,
        product_id: &str,
        storage_ids: &[String],
    ) -> RepositoryResult<f64> {
        if storage_ids.is_empty() {
            return Ok(0.0);
        }
        let placeholders = sql_placeholders(storage_ids.len());

        let incoming_sql = format!(
            r#"
            SELECT COALESCE(SUM(quantity), 0.0)
            FROM stock_move
            WHERE product_id = ? AND state = 'DONE' AND to_location_id IN ({})
            "#,
            placeholders
        );
        let outgoing_sql = format!(
            r#"
            SELECT COALESCE(SUM(quantity), 0.0)
            FROM stock_move
            WHERE product_id = ? AND state IN ('DONE', 'ASSIGNED')
              AND from_location_id IN ({})
            "#,
            placeholders
        );

        let mut values = vec![product_id.to_string()];
        values.extend(storage_ids.iter().cloned());

        let incoming: f64 =
            tx.query_row(&incoming_sql, params_from_iter(values.iter()), |row| {
                row.get(0)
            })?;
        let outgoing: f64 =
            tx.query_row(&outgoing_sql, params_from_iter(values.iter()), |row| {
                row.get(0)
            })?;

        Ok(incoming - outgoing)
    }
}
