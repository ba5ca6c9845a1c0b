// ==========================================
// 出库单自动指派系统 - 产品仓储
// ==========================================

use crate::domain::product::Product;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 产品仓储
pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<Product> {
        Ok(Product {
            product_id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
        })
    }

    /// 插入产品
    pub fn insert(&self, product: &Product) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO product (product_id, code, name) VALUES (?1, ?2, ?3)",
            params![product.product_id, product.code, product.name],
        )?;
        Ok(())
    }

    /// 按 ID 查询产品
    pub fn find_by_id(&self, product_id: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                "SELECT product_id, code, name FROM product WHERE product_id = ?1",
                params![product_id],
                Self::map_row,
            )
            .optional()?;
        Ok(product)
    }

    /// 按编码查询产品
    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                "SELECT product_id, code, name FROM product WHERE code = ?1",
                params![code],
                Self::map_row,
            )
            .optional()?;
        Ok(product)
    }
}
