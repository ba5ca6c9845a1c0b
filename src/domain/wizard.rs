// ==========================================
// 出库单自动指派系统 - 向导会话实体
// ==========================================

use crate::domain::types::WizardStep;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 指派向导会话
///
/// 一次人工交互对应一条会话记录，随确认/取消进入终态，
/// 过期会话由 cleanup_expired 批量删除。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    /// 会话 ID
    pub session_id: String,

    /// 当前步骤
    pub step: WizardStep,

    /// 选定的仓库
    pub warehouse_id: Option<String>,

    /// 截止时间（只保留创建时间严格晚于该时刻的候选单）
    pub from_datetime: Option<NaiveDateTime>,

    /// 候选出库单 ID 集合
    pub candidate_ids: Vec<String>,

    /// 创建时间
    pub created_at: NaiveDateTime,

    /// 过期时间
    pub expires_at: NaiveDateTime,
}

impl WizardSession {
    /// 会话是否已过期
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now >= self.expires_at
    }
}
