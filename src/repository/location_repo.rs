// ==========================================
// 出库单自动指派系统 - 库位仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::location::Location;
use crate::domain::types::LocationType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_placeholders;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 库位仓储
/// 职责: 管理 location 表的查询与写入
pub struct LocationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LocationRepository {
    /// 从共享连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<Location> {
        Ok(Location {
            location_id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            location_type: LocationType::from_db_str(&row.get::<_, String>(3)?),
            parent_id: row.get(4)?,
            active: row.get::<_, i64>(5)? != 0,
        })
    }

    const SELECT_COLUMNS: &'static str =
        "location_id, code, name, location_type, parent_id, active";

    /// 插入库位
    pub fn insert(&self, location: &Location) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO location (location_id, code, name, location_type, parent_id, active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                location.location_id,
                location.code,
                location.name,
                location.location_type.to_db_str(),
                location.parent_id,
                location.active as i64,
            ],
        )?;
        Ok(())
    }

    /// 按 ID 查询库位
    pub fn find_by_id(&self, location_id: &str) -> RepositoryResult<Option<Location>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM location WHERE location_id = ?1",
            Self::SELECT_COLUMNS
        );
        let location = conn
            .query_row(&sql, params![location_id], Self::map_row)
            .optional()?;
        Ok(location)
    }

    /// 按类型查询启用的库位
    pub fn find_by_type(&self, location_type: LocationType) -> RepositoryResult<Vec<Location>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM location WHERE location_type = ?1 AND active = 1 ORDER BY location_id",
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let locations = stmt
            .query_map(params![location_type.to_db_str()], Self::map_row)?
            .collect::<SqliteResult<Vec<Location>>>()?;
        Ok(locations)
    }

    /// 查询普通存储区库位（排除指定编码，如出库暂存区 "OUT"）
    pub fn find_storage_excluding(&self, exclude_code: &str) -> RepositoryResult<Vec<Location>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM location
            WHERE location_type = 'STORAGE'
              AND active = 1
              AND (code IS NULL OR code <> ?1)
            ORDER BY location_id
            "#,
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let locations = stmt
            .query_map(params![exclude_code], Self::map_row)?
            .collect::<SqliteResult<Vec<Location>>>()?;
        Ok(locations)
    }

    /// 按名称集合查询库位（仓库名过滤用）
    pub fn find_by_names(&self, names: &[String]) -> RepositoryResult<Vec<Location>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM location WHERE name IN ({}) ORDER BY location_id",
            Self::SELECT_COLUMNS,
            sql_placeholders(names.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let locations = stmt
            .query_map(params_from_iter(names.iter()), Self::map_row)?
            .collect::<SqliteResult<Vec<Location>>>()?;
        Ok(locations)
    }
}
