// ==========================================
// 出库单自动指派系统 - 定时任务实体
// ==========================================

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 定时任务条目
///
/// 调度器按 next_call 触发；清扫任务用
/// `next_call - interval_seconds` 推导回看窗口起点，
/// 因此窗口与实际执行时刻无关，延迟执行也能覆盖整个间隔。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronTask {
    /// 任务标识（注册表键）
    pub task_id: String,

    /// 任务名称
    pub name: String,

    /// 执行间隔（秒）
    pub interval_seconds: i64,

    /// 下次计划执行时间
    pub next_call: NaiveDateTime,

    /// 任务参数（JSON，对清扫任务为可选的仓库名称数组）
    pub args_json: Option<String>,

    /// 是否启用
    pub active: bool,

    /// 最近一次执行时间
    pub last_run_at: Option<NaiveDateTime>,

    /// 最近一次执行错误
    pub last_error: Option<String>,
}

impl CronTask {
    /// 回看窗口起点: next_call - interval
    pub fn lookback_start(&self) -> NaiveDateTime {
        self.next_call - Duration::seconds(self.interval_seconds)
    }

    /// 解析任务参数
    pub fn args(&self) -> Result<Option<serde_json::Value>, serde_json::Error> {
        match &self.args_json {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(serde_json::from_str(raw)?)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_lookback_start_is_next_call_minus_interval() {
        let task = CronTask {
            task_id: "t".to_string(),
            name: "测试".to_string(),
            interval_seconds: 86400,
            next_call: dt(2024, 1, 2, 0),
            args_json: None,
            active: true,
            last_run_at: None,
            last_error: None,
        };
        // 与实际墙钟时间无关
        assert_eq!(task.lookback_start(), dt(2024, 1, 1, 0));
    }

    #[test]
    fn test_args_parsing() {
        let mut task = CronTask {
            task_id: "t".to_string(),
            name: "测试".to_string(),
            interval_seconds: 60,
            next_call: dt(2024, 1, 1, 0),
            args_json: Some(r#"["中心仓"]"#.to_string()),
            active: true,
            last_run_at: None,
            last_error: None,
        };
        let parsed = task.args().unwrap().unwrap();
        assert_eq!(parsed, serde_json::json!(["中心仓"]));

        task.args_json = None;
        assert!(task.args().unwrap().is_none());

        task.args_json = Some("  ".to_string());
        assert!(task.args().unwrap().is_none());
    }
}
