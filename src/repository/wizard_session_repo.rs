// ==========================================
// 出库单自动指派系统 - 向导会话仓储
// ==========================================

use crate::domain::types::WizardStep;
use crate::domain::wizard::WizardSession;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, parse_datetime};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 向导会话仓储
/// 职责: 管理 wizard_session 表，候选集以 JSON 存储
pub struct WizardSessionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WizardSessionRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    const SELECT_COLUMNS: &'static str = "session_id, step, warehouse_id, from_datetime, \
         candidate_ids_json, created_at, expires_at";

    fn map_row(row: &Row<'_>) -> SqliteResult<WizardSession> {
        let candidate_ids_json: String = row.get(4)?;
        Ok(WizardSession {
            session_id: row.get(0)?,
            step: WizardStep::from_db_str(&row.get::<_, String>(1)?),
            warehouse_id: row.get(2)?,
            from_datetime: row
                .get::<_, Option<String>>(3)?
                .map(|s| parse_datetime(&s)),
            candidate_ids: serde_json::from_str(&candidate_ids_json).unwrap_or_default(),
            created_at: parse_datetime(&row.get::<_, String>(5)?),
            expires_at: parse_datetime(&row.get::<_, String>(6)?),
        })
    }

    fn candidate_ids_json(session: &WizardSession) -> RepositoryResult<String> {
        serde_json::to_string(&session.candidate_ids)
            .map_err(|e| RepositoryError::InternalError(format!("候选集序列化失败: {}", e)))
    }

    /// 插入会话
    pub fn insert(&self, session: &WizardSession) -> RepositoryResult<()> {
        let candidate_ids_json = Self::candidate_ids_json(session)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO wizard_session (
                session_id, step, warehouse_id, from_datetime,
                candidate_ids_json, created_at, expires_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                session.session_id,
                session.step.to_db_str(),
                session.warehouse_id,
                session.from_datetime.map(format_datetime),
                candidate_ids_json,
                format_datetime(session.created_at),
                format_datetime(session.expires_at),
            ],
        )?;
        Ok(())
    }

    /// 按 ID 查询会话
    pub fn find_by_id(&self, session_id: &str) -> RepositoryResult<Option<WizardSession>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM wizard_session WHERE session_id = ?1",
            Self::SELECT_COLUMNS
        );
        let session = conn
            .query_row(&sql, params![session_id], Self::map_row)
            .optional()?;
        Ok(session)
    }

    /// 覆盖更新会话（步骤与表单数据）
    pub fn update(&self, session: &WizardSession) -> RepositoryResult<()> {
        let candidate_ids_json = Self::candidate_ids_json(session)?;
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE wizard_session
            SET step = ?2, warehouse_id = ?3, from_datetime = ?4, candidate_ids_json = ?5
            WHERE session_id = ?1
            "#,
            params![
                session.session_id,
                session.step.to_db_str(),
                session.warehouse_id,
                session.from_datetime.map(format_datetime),
                candidate_ids_json,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "wizard_session".to_string(),
                id: session.session_id.clone(),
            });
        }
        Ok(())
    }

    /// 删除会话
    pub fn delete(&self, session_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM wizard_session WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(())
    }

    /// 清理过期会话
    ///
    /// # 返回
    /// - Ok(usize): 删除的会话数
    pub fn cleanup_expired(&self, now: NaiveDateTime) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM wizard_session WHERE expires_at <= ?1",
            params![format_datetime(now)],
        )?;
        Ok(affected)
    }

    /// 会话列表（按创建时间倒序，调试用）
    pub fn list(&self) -> RepositoryResult<Vec<WizardSession>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM wizard_session ORDER BY created_at DESC",
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let sessions = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<WizardSession>>>()?;
        Ok(sessions)
    }
}
