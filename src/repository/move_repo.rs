// ==========================================
// 出库单自动指派系统 - 库存移动仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::stock_move::StockMove;
use crate::domain::types::MoveState;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, parse_datetime, sql_placeholders};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 库存移动仓储
/// 职责: 管理 stock_move 表的查询与写入
pub struct StockMoveRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StockMoveRepository {
    /// 从共享连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    const SELECT_COLUMNS: &'static str = "move_id, shipment_id, product_id, \
         from_location_id, to_location_id, quantity, state, created_at, updated_at";

    fn map_row(row: &Row<'_>) -> SqliteResult<StockMove> {
        Ok(StockMove {
            move_id: row.get(0)?,
            shipment_id: row.get(1)?,
            product_id: row.get(2)?,
            from_location_id: row.get(3)?,
            to_location_id: row.get(4)?,
            quantity: row.get(5)?,
            state: MoveState::from_db_str(&row.get::<_, String>(6)?),
            created_at: parse_datetime(&row.get::<_, String>(7)?),
            updated_at: parse_datetime(&row.get::<_, String>(8)?),
        })
    }

    /// 插入库存移动
    pub fn insert(&self, stock_move: &StockMove) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO stock_move (
                move_id, shipment_id, product_id, from_location_id, to_location_id,
                quantity, state, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                stock_move.move_id,
                stock_move.shipment_id,
                stock_move.product_id,
                stock_move.from_location_id,
                stock_move.to_location_id,
                stock_move.quantity,
                stock_move.state.to_db_str(),
                format_datetime(stock_move.created_at),
                format_datetime(stock_move.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 按 ID 查询库存移动
    pub fn find_by_id(&self, move_id: &str) -> RepositoryResult<Option<StockMove>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM stock_move WHERE move_id = ?1",
            Self::SELECT_COLUMNS
        );
        let stock_move = conn
            .query_row(&sql, params![move_id], Self::map_row)
            .optional()?;
        Ok(stock_move)
    }

    /// 查询出库单下指定状态的移动
    pub fn find_by_shipment(
        &self,
        shipment_id: &str,
        state: Option<MoveState>,
    ) -> RepositoryResult<Vec<StockMove>> {
        let conn = self.get_conn()?;
        let mut sql = format!(
            "SELECT {} FROM stock_move WHERE shipment_id = ?",
            Self::SELECT_COLUMNS
        );
        let mut values = vec![shipment_id.to_string()];
        if let Some(state) = state {
            sql.push_str(" AND state = ?");
            values.push(state.to_db_str().to_string());
        }
        sql.push_str(" ORDER BY created_at, move_id");

        let mut stmt = conn.prepare(&sql)?;
        let moves = stmt
            .query_map(params_from_iter(values.iter()), Self::map_row)?
            .collect::<SqliteResult<Vec<StockMove>>>()?;
        Ok(moves)
    }

    /// 自某时刻起新到货的产品集合
    ///
    /// 过滤条件: DONE 状态、目标库位属于给定存储区、写时间戳不早于 from_date。
    ///
    /// # 返回
    /// - Ok(Vec<String>): 去重后的产品 ID 列表（按 ID 排序）
    pub fn products_arrived_since(
        &self,
        from_date: NaiveDateTime,
        storage_location_ids: &[String],
    ) -> RepositoryResult<Vec<String>> {
        if storage_location_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT DISTINCT product_id
            FROM stock_move
            WHERE state = 'DONE'
              AND updated_at >= ?
              AND to_location_id IN ({})
            ORDER BY product_id
            "#,
            sql_placeholders(storage_location_ids.len())
        );
        let mut values = vec![format_datetime(from_date)];
        values.extend(storage_location_ids.iter().cloned());

        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                row.get::<_, String>(0)
            })?
            .collect::<SqliteResult<Vec<String>>>()?;
        Ok(products)
    }

    /// 给定产品集合流向客户库位的草稿移动（未分配的出库需求）
    pub fn find_draft_demand(
        &self,
        product_ids: &[String],
        customer_location_ids: &[String],
    ) -> RepositoryResult<Vec<StockMove>> {
        if product_ids.is_empty() || customer_location_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM stock_move
            WHERE state = 'DRAFT'
              AND product_id IN ({})
              AND to_location_id IN ({})
            ORDER BY created_at, move_id
            "#,
            Self::SELECT_COLUMNS,
            sql_placeholders(product_ids.len()),
            sql_placeholders(customer_location_ids.len())
        );
        let mut values: Vec<String> = Vec::with_capacity(
            product_ids.len() + customer_location_ids.len(),
        );
        values.extend(product_ids.iter().cloned());
        values.extend(customer_location_ids.iter().cloned());

        let mut stmt = conn.prepare(&sql)?;
        let moves = stmt
            .query_map(params_from_iter(values.iter()), Self::map_row)?
            .collect::<SqliteResult<Vec<StockMove>>>()?;
        Ok(moves)
    }

    /// 更新移动状态
    pub fn update_state(
        &self,
        move_id: &str,
        state: MoveState,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE stock_move SET state = ?2, updated_at = ?3 WHERE move_id = ?1",
            params![move_id, state.to_db_str(), format_datetime(now)],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "stock_move".to_string(),
                id: move_id.to_string(),
            });
        }
        Ok(())
    }
}
