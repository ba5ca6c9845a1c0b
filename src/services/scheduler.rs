// ==========================================
// 出库单自动指派系统 - 定时任务调度器
// ==========================================
// 职责: 轮询 cron_task 表，按注册表分发到期任务
// 约束: 先执行任务、后推进 next_call——
//       清扫依赖执行时 next_call 仍为本次计划时刻来推导回看窗口
// ==========================================

use crate::domain::cron::CronTask;
use crate::repository::error::RepositoryResult;
use crate::repository::{CronTaskRepository, WizardSessionRepository};
use crate::services::sweep::AssignSweepService;
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// 定时任务接口
///
/// 任务标识到实现的映射由 CronScheduler 的注册表维护。
#[async_trait]
pub trait CronJob: Send + Sync {
    /// 执行一次任务
    ///
    /// # 参数
    /// - args: cron 条目上的 JSON 参数
    async fn run(&self, args: Option<serde_json::Value>) -> anyhow::Result<()>;
}

/// 清扫任务适配器
///
/// 参数约定: JSON 数组，元素为仓库名称；null/缺省表示不过滤。
pub struct SweepJob {
    sweep: Arc<AssignSweepService>,
}

impl SweepJob {
    pub fn new(sweep: Arc<AssignSweepService>) -> Self {
        Self { sweep }
    }
}

#[async_trait]
impl CronJob for SweepJob {
    async fn run(&self, args: Option<serde_json::Value>) -> anyhow::Result<()> {
        let warehouse_names: Option<Vec<String>> = match args {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| anyhow::anyhow!("清扫任务参数解析失败: {}", e))?,
            None => None,
        };

        let now = Utc::now().naive_utc();
        let assigned = self.sweep.run(warehouse_names.as_deref(), now)?;
        if !assigned.is_empty() {
            tracing::info!("清扫任务指派成功: {:?}", assigned);
        }
        Ok(())
    }
}

/// 向导会话清理任务
///
/// 删除已过期的向导会话行。
pub struct SessionCleanupJob {
    session_repo: Arc<WizardSessionRepository>,
}

impl SessionCleanupJob {
    pub fn new(session_repo: Arc<WizardSessionRepository>) -> Self {
        Self { session_repo }
    }
}

#[async_trait]
impl CronJob for SessionCleanupJob {
    async fn run(&self, _args: Option<serde_json::Value>) -> anyhow::Result<()> {
        let removed = self.session_repo.cleanup_expired(Utc::now().naive_utc())?;
        if removed > 0 {
            tracing::info!("清理过期向导会话 {} 个", removed);
        }
        Ok(())
    }
}

/// 定时任务调度器
pub struct CronScheduler {
    cron_repo: Arc<CronTaskRepository>,
    jobs: HashMap<String, Arc<dyn CronJob>>,
    poll_seconds: u64,
}

impl CronScheduler {
    pub fn new(cron_repo: Arc<CronTaskRepository>, poll_seconds: u64) -> Self {
        Self {
            cron_repo,
            jobs: HashMap::new(),
            poll_seconds: poll_seconds.max(1),
        }
    }

    /// 注册任务实现
    pub fn register(&mut self, task_id: &str, job: Arc<dyn CronJob>) {
        self.jobs.insert(task_id.to_string(), job);
    }

    /// 执行所有到期任务
    ///
    /// 任务失败不会中断其他任务：错误被记入条目的 last_error，
    /// next_call 照常推进（下个周期自然重试）。
    ///
    /// # 返回
    /// - Ok(usize): 成功执行的任务数
    pub async fn run_due(&self, now: NaiveDateTime) -> RepositoryResult<usize> {
        let due_tasks = self.cron_repo.find_due(now)?;
        let mut succeeded = 0;

        for task in due_tasks {
            let Some(job) = self.jobs.get(&task.task_id) else {
                tracing::warn!("cron 条目 {} 没有注册任务实现，跳过", task.task_id);
                continue;
            };

            let result = match task.args() {
                Ok(args) => job.run(args).await,
                Err(e) => Err(anyhow::anyhow!("任务参数解析失败: {}", e)),
            };

            let last_error = match &result {
                Ok(()) => {
                    succeeded += 1;
                    None
                }
                Err(e) => {
                    tracing::error!("cron 任务 {} 执行失败: {}", task.task_id, e);
                    Some(e.to_string())
                }
            };

            let next_call = Self::advance_next_call(&task, now);
            self.cron_repo.update_after_run(
                &task.task_id,
                next_call,
                now,
                last_error.as_deref(),
            )?;
        }

        Ok(succeeded)
    }

    /// 推进 next_call 到严格晚于 now 的下一个周期点
    ///
    /// 错过的周期折叠进本次执行——回看窗口以推进前的
    /// next_call 为基准，已覆盖整段间隔。
    fn advance_next_call(task: &CronTask, now: NaiveDateTime) -> NaiveDateTime {
        let interval = Duration::seconds(task.interval_seconds);
        let mut next_call = task.next_call + interval;
        while next_call <= now {
            next_call += interval;
        }
        next_call
    }

    /// 常驻轮询循环
    pub async fn run_forever(&self) {
        tracing::info!("调度器启动: 轮询间隔 {} 秒", self.poll_seconds);
        loop {
            let now = Utc::now().naive_utc();
            if let Err(e) = self.run_due(now).await {
                tracing::error!("调度器轮询失败: {}", e);
            }
            tokio::time::sleep(std::time::Duration::from_secs(self.poll_seconds)).await;
        }
    }
}
