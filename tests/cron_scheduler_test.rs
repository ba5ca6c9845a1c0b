// ==========================================
// 定时任务调度器集成测试
// ==========================================
// 测试目标: 到期分发、next_call 推进、失败记录、未注册任务跳过
// ==========================================


use async_trait::async_trait;
use shipment_autoassign::domain::{CronTask, WizardSession, WizardStep};
use shipment_autoassign::logging;
use shipment_autoassign::services::{CronJob, CronScheduler, SessionCleanupJob};
use std::sync::{Arc, Mutex};
use test_helpers::*;

/// 记录每次调用参数的测试任务
struct RecordingJob {
    calls: Arc<Mutex<Vec<Option<serde_json::Value>>>>,
    fail: bool,
}

#[async_trait]
impl CronJob for RecordingJob {
    async fn run(&self, args: Option<serde_json::Value>) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(args);
        if self.fail {
            anyhow::bail!("预期内的任务失败");
        }
        Ok(())
    }
}

fn seed_task(env: &TestEnv, task_id: &str, next_call: &str, interval_seconds: i64, args: Option<&str>) {
    env.cron_repo
        .upsert(&CronTask {
            task_id: task_id.to_string(),
            name: format!("测试任务-{}", task_id),
            interval_seconds,
            next_call: dt(next_call),
            args_json: args.map(|s| s.to_string()),
            active: true,
            last_run_at: None,
            last_error: None,
        })
        .unwrap();
}

#[tokio::test]
async fn test_run_due_executes_and_advances_next_call() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    seed_task(&env, "job_a", "2024-01-02 00:00:00", 3600, Some(r#"["中心仓"]"#));

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = CronScheduler::new(env.cron_repo.clone(), 1);
    scheduler.register(
        "job_a",
        Arc::new(RecordingJob {
            calls: calls.clone(),
            fail: false,
        }),
    );

    let now = dt("2024-01-02 00:05:00");
    let ran = scheduler.run_due(now).await.expect("run_due 应该成功");
    assert_eq!(ran, 1);
    assert_eq!(
        calls.lock().unwrap().as_slice(),
        &[Some(serde_json::json!(["中心仓"]))]
    );

    let task = env.cron_repo.find_by_id("job_a").unwrap().unwrap();
    assert_eq!(task.next_call, dt("2024-01-02 01:00:00"));
    assert_eq!(task.last_run_at, Some(now));
    assert!(task.last_error.is_none());

    // 未到期不再触发
    let ran = scheduler.run_due(now).await.unwrap();
    assert_eq!(ran, 0);
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missed_ticks_collapse_into_one_run() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    // 已经错过了两个周期
    seed_task(&env, "job_a", "2024-01-02 00:00:00", 3600, None);

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = CronScheduler::new(env.cron_repo.clone(), 1);
    scheduler.register(
        "job_a",
        Arc::new(RecordingJob {
            calls: calls.clone(),
            fail: false,
        }),
    );

    let now = dt("2024-01-02 02:30:00");
    let ran = scheduler.run_due(now).await.unwrap();
    assert_eq!(ran, 1);
    assert_eq!(calls.lock().unwrap().len(), 1);

    // next_call 跳到 now 之后的第一个周期点
    let task = env.cron_repo.find_by_id("job_a").unwrap().unwrap();
    assert_eq!(task.next_call, dt("2024-01-02 03:00:00"));
}

#[tokio::test]
async fn test_failing_job_records_last_error_and_advances() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    seed_task(&env, "job_a", "2024-01-02 00:00:00", 3600, None);

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = CronScheduler::new(env.cron_repo.clone(), 1);
    scheduler.register(
        "job_a",
        Arc::new(RecordingJob {
            calls: calls.clone(),
            fail: true,
        }),
    );

    let now = dt("2024-01-02 00:05:00");
    let ran = scheduler.run_due(now).await.unwrap();
    assert_eq!(ran, 0);

    let task = env.cron_repo.find_by_id("job_a").unwrap().unwrap();
    assert!(task
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("预期内的任务失败")));
    // 失败同样推进周期，等下个周期自然重试
    assert_eq!(task.next_call, dt("2024-01-02 01:00:00"));
}

#[tokio::test]
async fn test_unregistered_task_is_skipped_untouched() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    seed_task(&env, "job_nobody", "2024-01-02 00:00:00", 3600, None);

    let scheduler = CronScheduler::new(env.cron_repo.clone(), 1);
    let ran = scheduler.run_due(dt("2024-01-02 00:05:00")).await.unwrap();
    assert_eq!(ran, 0);

    // 条目保持原样，问题在日志中可见
    let task = env.cron_repo.find_by_id("job_nobody").unwrap().unwrap();
    assert_eq!(task.next_call, dt("2024-01-02 00:00:00"));
    assert!(task.last_run_at.is_none());
}

#[tokio::test]
async fn test_session_cleanup_job_removes_expired_sessions() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");

    // 一条早已过期的会话
    env.session_repo
        .insert(&WizardSession {
            session_id: "sess-old".to_string(),
            step: WizardStep::Start,
            warehouse_id: None,
            from_datetime: None,
            candidate_ids: Vec::new(),
            created_at: dt("2024-01-01 09:00:00"),
            expires_at: dt("2024-01-02 09:00:00"),
        })
        .unwrap();

    seed_task(&env, "cleanup", "2024-01-03 00:00:00", 3600, None);
    let mut scheduler = CronScheduler::new(env.cron_repo.clone(), 1);
    scheduler.register(
        "cleanup",
        Arc::new(SessionCleanupJob::new(env.session_repo.clone())),
    );

    let ran = scheduler.run_due(dt("2024-01-03 00:05:00")).await.unwrap();
    assert_eq!(ran, 1);
    assert!(env.session_repo.find_by_id("sess-old").unwrap().is_none());
}

#[tokio::test]
async fn test_inactive_task_is_not_due() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    let mut task = CronTask {
        task_id: "job_a".to_string(),
        name: "测试任务".to_string(),
        interval_seconds: 3600,
        next_call: dt("2024-01-02 00:00:00"),
        args_json: None,
        active: false,
        last_run_at: None,
        last_error: None,
    };
    env.cron_repo.upsert(&task).unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = CronScheduler::new(env.cron_repo.clone(), 1);
    scheduler.register(
        "job_a",
        Arc::new(RecordingJob {
            calls: calls.clone(),
            fail: false,
        }),
    );

    let ran = scheduler.run_due(dt("2024-01-02 00:05:00")).await.unwrap();
    assert_eq!(ran, 0);
    assert!(calls.lock().unwrap().is_empty());

    // 启用后才会触发
    task.active = true;
    env.cron_repo.upsert(&task).unwrap();
    let ran = scheduler.run_due(dt("2024-01-02 00:05:00")).await.unwrap();
    assert_eq!(ran, 1);
}
