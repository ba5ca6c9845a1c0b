// ==========================================
// 出库单自动指派系统 - 定时任务仓储
// ==========================================

use crate::domain::cron::CronTask;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, parse_datetime};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 定时任务仓储
/// 职责: 管理 cron_task 表
pub struct CronTaskRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CronTaskRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    const SELECT_COLUMNS: &'static str = "task_id, name, interval_seconds, next_call, \
         args_json, active, last_run_at, last_error";

    fn map_row(row: &Row<'_>) -> SqliteResult<CronTask> {
        Ok(CronTask {
            task_id: row.get(0)?,
            name: row.get(1)?,
            interval_seconds: row.get(2)?,
            next_call: parse_datetime(&row.get::<_, String>(3)?),
            args_json: row.get(4)?,
            active: row.get::<_, i64>(5)? != 0,
            last_run_at: row
                .get::<_, Option<String>>(6)?
                .map(|s| parse_datetime(&s)),
            last_error: row.get(7)?,
        })
    }

    /// 插入或替换任务条目
    pub fn upsert(&self, task: &CronTask) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO cron_task (
                task_id, name, interval_seconds, next_call,
                args_json, active, last_run_at, last_error
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                task.task_id,
                task.name,
                task.interval_seconds,
                format_datetime(task.next_call),
                task.args_json,
                task.active as i64,
                task.last_run_at.map(format_datetime),
                task.last_error,
            ],
        )?;
        Ok(())
    }

    /// 按标识查询任务
    pub fn find_by_id(&self, task_id: &str) -> RepositoryResult<Option<CronTask>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM cron_task WHERE task_id = ?1",
            Self::SELECT_COLUMNS
        );
        let task = conn
            .query_row(&sql, params![task_id], Self::map_row)
            .optional()?;
        Ok(task)
    }

    /// 查询到期的启用任务（next_call <= now）
    pub fn find_due(&self, now: NaiveDateTime) -> RepositoryResult<Vec<CronTask>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM cron_task WHERE active = 1 AND next_call <= ?1 ORDER BY next_call, task_id",
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![format_datetime(now)], Self::map_row)?
            .collect::<SqliteResult<Vec<CronTask>>>()?;
        Ok(tasks)
    }

    /// 记录一次执行结果并推进 next_call
    pub fn update_after_run(
        &self,
        task_id: &str,
        next_call: NaiveDateTime,
        last_run_at: NaiveDateTime,
        last_error: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE cron_task
            SET next_call = ?2, last_run_at = ?3, last_error = ?4
            WHERE task_id = ?1
            "#,
            params![
                task_id,
                format_datetime(next_call),
                format_datetime(last_run_at),
                last_error,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "cron_task".to_string(),
                id: task_id.to_string(),
            });
        }
        Ok(())
    }
}
