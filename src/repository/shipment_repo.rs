// ==========================================
// 出库单自动指派系统 - 出库单仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::shipment::ShipmentOut;
use crate::domain::types::ShipmentState;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, parse_datetime, sql_placeholders};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 出库单仓储
/// 职责: 管理 shipment_out 表的查询与状态写入
pub struct ShipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShipmentRepository {
    /// 从共享连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    const SELECT_COLUMNS: &'static str = "shipment_id, number, warehouse_id, \
         customer_location_id, state, created_at, updated_at";

    fn map_row(row: &Row<'_>) -> SqliteResult<ShipmentOut> {
        Ok(ShipmentOut {
            shipment_id: row.get(0)?,
            number: row.get(1)?,
            warehouse_id: row.get(2)?,
            customer_location_id: row.get(3)?,
            state: ShipmentState::from_db_str(&row.get::<_, String>(4)?),
            created_at: parse_datetime(&row.get::<_, String>(5)?),
            updated_at: parse_datetime(&row.get::<_, String>(6)?),
        })
    }

    /// 插入出库单
    pub fn insert(&self, shipment: &ShipmentOut) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO shipment_out (
                shipment_id, number, warehouse_id, customer_location_id,
                state, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                shipment.shipment_id,
                shipment.number,
                shipment.warehouse_id,
                shipment.customer_location_id,
                shipment.state.to_db_str(),
                format_datetime(shipment.created_at),
                format_datetime(shipment.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 按 ID 查询出库单
    pub fn find_by_id(&self, shipment_id: &str) -> RepositoryResult<Option<ShipmentOut>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shipment_out WHERE shipment_id = ?1",
            Self::SELECT_COLUMNS
        );
        let shipment = conn
            .query_row(&sql, params![shipment_id], Self::map_row)
            .optional()?;
        Ok(shipment)
    }

    /// 按 ID 集合查询出库单
    pub fn find_by_ids(&self, shipment_ids: &[String]) -> RepositoryResult<Vec<ShipmentOut>> {
        if shipment_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shipment_out WHERE shipment_id IN ({}) ORDER BY shipment_id",
            Self::SELECT_COLUMNS,
            sql_placeholders(shipment_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let shipments = stmt
            .query_map(params_from_iter(shipment_ids.iter()), Self::map_row)?
            .collect::<SqliteResult<Vec<ShipmentOut>>>()?;
        Ok(shipments)
    }

    /// 查询等待库存的出库单
    ///
    /// # 参数
    /// - warehouse_id: 限定仓库（None 表示不限定）
    /// - created_after: 只保留创建时间严格晚于该时刻的单据（None 表示不限定）
    pub fn find_waiting(
        &self,
        warehouse_id: Option<&str>,
        created_after: Option<NaiveDateTime>,
    ) -> RepositoryResult<Vec<ShipmentOut>> {
        let conn = self.get_conn()?;

        let mut sql = format!(
            "SELECT {} FROM shipment_out WHERE state = 'WAITING'",
            Self::SELECT_COLUMNS
        );
        let mut values: Vec<String> = Vec::new();
        if let Some(warehouse) = warehouse_id {
            sql.push_str(" AND warehouse_id = ?");
            values.push(warehouse.to_string());
        }
        if let Some(cutoff) = created_after {
            // 严格大于: 恰好等于截止时刻的单据被排除
            sql.push_str(" AND created_at > ?");
            values.push(format_datetime(cutoff));
        }
        sql.push_str(" ORDER BY created_at, shipment_id");

        let mut stmt = conn.prepare(&sql)?;
        let shipments = stmt
            .query_map(params_from_iter(values.iter()), Self::map_row)?
            .collect::<SqliteResult<Vec<ShipmentOut>>>()?;
        Ok(shipments)
    }

    /// 更新单个出库单状态
    pub fn update_state(
        &self,
        shipment_id: &str,
        state: ShipmentState,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE shipment_out SET state = ?2, updated_at = ?3 WHERE shipment_id = ?1",
            params![shipment_id, state.to_db_str(), format_datetime(now)],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "shipment_out".to_string(),
                id: shipment_id.to_string(),
            });
        }
        Ok(())
    }

    /// 批量更新出库单状态（单事务）
    pub fn update_states(
        &self,
        shipment_ids: &[String],
        state: ShipmentState,
        now: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        if shipment_ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let sql = format!(
            "UPDATE shipment_out SET state = '{}', updated_at = ? WHERE shipment_id IN ({})",
            state.to_db_str(),
            sql_placeholders(shipment_ids.len())
        );
        let mut values = vec![format_datetime(now)];
        values.extend(shipment_ids.iter().cloned());
        let affected = tx.execute(&sql, params_from_iter(values.iter()))?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(affected)
    }
}
