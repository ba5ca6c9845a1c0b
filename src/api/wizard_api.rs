// ==========================================
// 出库单自动指派系统 - 指派向导 API
// ==========================================
// 职责: 两步式人工指派向导的显式状态机
// 状态机: START → SHIPMENTS → DONE; START/SHIPMENTS 可取消
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::shipment::ShipmentOut;
use crate::domain::types::{ShipmentState, WizardStep};
use crate::domain::wizard::WizardSession;
use crate::i18n::{t, t_with_args};
use crate::repository::{ShipmentRepository, WizardSessionRepository};
use crate::services::assign::AssignService;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

// ==========================================
// DTO
// ==========================================

/// 向导第一步表单：仓库与截止时间均可不填（不填即不限定）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WizardStartForm {
    /// 仓库 ID
    pub warehouse_id: Option<String>,

    /// 截止时间（只保留创建时间严格晚于该时刻的候选单）
    pub from_datetime: Option<NaiveDateTime>,
}

/// 候选出库单视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentCandidateView {
    pub shipment_id: String,
    pub number: String,
    pub warehouse_id: String,
    pub state: ShipmentState,
    pub created_at: NaiveDateTime,
}

impl From<ShipmentOut> for ShipmentCandidateView {
    fn from(s: ShipmentOut) -> Self {
        Self {
            shipment_id: s.shipment_id,
            number: s.number,
            warehouse_id: s.warehouse_id,
            state: s.state,
            created_at: s.created_at,
        }
    }
}

/// 向导结束动作：打开按 ID 过滤的出库单列表视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentListAction {
    /// 列表过滤域：恰好是本次指派成功的出库单 ID（顺序不保证）
    pub shipment_ids: Vec<String>,
}

// ==========================================
// WizardApi - 指派向导
// ==========================================

/// 会话 TTL 的配置键（小时）
const SESSION_TTL_CONFIG_KEY: &str = "wizard_session_ttl_hours";

/// 会话 TTL 默认值（小时）
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// 指派向导 API
pub struct WizardApi {
    session_repo: Arc<WizardSessionRepository>,
    shipment_repo: Arc<ShipmentRepository>,
    assign: Arc<AssignService>,
    config: Arc<ConfigManager>,
}

impl WizardApi {
    pub fn new(
        session_repo: Arc<WizardSessionRepository>,
        shipment_repo: Arc<ShipmentRepository>,
        assign: Arc<AssignService>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            session_repo,
            shipment_repo,
            assign,
            config,
        }
    }

    /// 发起一次向导会话
    ///
    /// # 返回
    /// - Ok(String): 新会话 ID（处于 START 步骤）
    pub fn start(&self, now: NaiveDateTime) -> ApiResult<String> {
        let ttl_hours = self
            .config
            .get_i64_or(SESSION_TTL_CONFIG_KEY, DEFAULT_SESSION_TTL_HOURS)
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        let session = WizardSession {
            session_id: Uuid::new_v4().to_string(),
            step: WizardStep::Start,
            warehouse_id: None,
            from_datetime: None,
            candidate_ids: Vec::new(),
            created_at: now,
            expires_at: now + Duration::hours(ttl_hours),
        };
        self.session_repo.insert(&session)?;
        tracing::debug!("向导会话创建: {}", session.session_id);
        Ok(session.session_id)
    }

    /// 提交第一步（仓库 + 截止时间），进入候选复核步骤
    ///
    /// 默认候选集: WAITING 状态、仓库等于所选仓库、
    /// 创建时间严格晚于截止时刻（恰好等于者被排除）。
    ///
    /// # 返回
    /// - Ok(Vec<ShipmentCandidateView>): 默认候选列表
    pub fn submit_start(
        &self,
        session_id: &str,
        form: &WizardStartForm,
        now: NaiveDateTime,
    ) -> ApiResult<Vec<ShipmentCandidateView>> {
        let mut session = self.load_session(session_id, now)?;
        self.require_step(&session, WizardStep::Start)?;

        let candidates = self
            .shipment_repo
            .find_waiting(form.warehouse_id.as_deref(), form.from_datetime)?;

        session.step = WizardStep::Shipments;
        session.warehouse_id = form.warehouse_id.clone();
        session.from_datetime = form.from_datetime;
        session.candidate_ids = candidates.iter().map(|s| s.shipment_id.clone()).collect();
        self.session_repo.update(&session)?;

        Ok(candidates.into_iter().map(Into::into).collect())
    }

    /// 覆盖候选集（操作员在复核步骤增删后提交）
    ///
    /// 编辑后的集合必须非空，且每一张都必须仍处于 WAITING。
    pub fn set_shipments(
        &self,
        session_id: &str,
        shipment_ids: &[String],
        now: NaiveDateTime,
    ) -> ApiResult<()> {
        let mut session = self.load_session(session_id, now)?;
        self.require_step(&session, WizardStep::Shipments)?;

        if shipment_ids.is_empty() {
            return Err(ApiError::InvalidInput(t("wizard.empty_selection")));
        }

        let shipments = self.shipment_repo.find_by_ids(shipment_ids)?;
        if shipments.len() != shipment_ids.len() {
            let found: Vec<&str> = shipments.iter().map(|s| s.shipment_id.as_str()).collect();
            let missing = shipment_ids
                .iter()
                .find(|id| !found.contains(&id.as_str()))
                .cloned()
                .unwrap_or_default();
            return Err(ApiError::InvalidInput(t_with_args(
                "wizard.unknown_shipment",
                &[("id", &missing)],
            )));
        }
        for shipment in &shipments {
            if !shipment.is_waiting() {
                return Err(ApiError::BusinessRuleViolation(t_with_args(
                    "wizard.shipment_not_waiting",
                    &[("number", &shipment.number)],
                )));
            }
        }

        session.candidate_ids = shipment_ids.to_vec();
        self.session_repo.update(&session)?;
        Ok(())
    }

    /// 确认并执行指派，进入 DONE
    ///
    /// 对编辑后的集合逐单调用指派原语，只保留完整成功者。
    /// 单个出库单指派抛错会中断整批（指派原语对"库存不足"
    /// 以返回值而非错误表达，正常情况下不会触发）。
    ///
    /// # 返回
    /// - Ok(ShipmentListAction): 过滤域恰为指派成功 ID 的列表视图动作
    pub fn assign(&self, session_id: &str, now: NaiveDateTime) -> ApiResult<ShipmentListAction> {
        let mut session = self.load_session(session_id, now)?;
        self.require_step(&session, WizardStep::Shipments)?;

        if session.candidate_ids.is_empty() {
            return Err(ApiError::InvalidInput(t("wizard.empty_selection")));
        }

        let mut assigned = Vec::new();
        for shipment_id in &session.candidate_ids {
            let ok = self
                .assign
                .assign_try(std::slice::from_ref(shipment_id), now)?;
            assigned.extend(ok);
        }

        session.step = WizardStep::Done;
        self.session_repo.update(&session)?;

        tracing::info!(
            "向导指派完成: 会话 {}, 候选 {} 单, 成功 {} 单",
            session_id,
            session.candidate_ids.len(),
            assigned.len()
        );
        Ok(ShipmentListAction {
            shipment_ids: assigned,
        })
    }

    /// 取消向导（START / SHIPMENTS 均可），无任何副作用
    pub fn cancel(&self, session_id: &str, now: NaiveDateTime) -> ApiResult<()> {
        let mut session = self.load_session(session_id, now)?;
        if session.step.is_terminal() {
            return Err(ApiError::InvalidStateTransition {
                from: session.step.to_string(),
                to: WizardStep::Cancelled.to_string(),
            });
        }
        session.step = WizardStep::Cancelled;
        self.session_repo.update(&session)?;
        Ok(())
    }

    /// 查询会话（调试/界面回显用）
    pub fn get_session(&self, session_id: &str, now: NaiveDateTime) -> ApiResult<WizardSession> {
        self.load_session(session_id, now)
    }

    /// 清理过期会话
    pub fn cleanup_expired(&self, now: NaiveDateTime) -> ApiResult<usize> {
        let removed = self.session_repo.cleanup_expired(now)?;
        if removed > 0 {
            tracing::info!("清理过期向导会话 {} 个", removed);
        }
        Ok(removed)
    }

    fn load_session(&self, session_id: &str, now: NaiveDateTime) -> ApiResult<WizardSession> {
        let session = self
            .session_repo
            .find_by_id(session_id)?
            .filter(|s| !s.is_expired(now))
            .ok_or_else(|| ApiError::NotFound(t("wizard.session_expired")))?;
        Ok(session)
    }

    fn require_step(&self, session: &WizardSession, expected: WizardStep) -> ApiResult<()> {
        if session.step != expected {
            return Err(ApiError::InvalidStateTransition {
                from: session.step.to_string(),
                to: expected.to_string(),
            });
        }
        Ok(())
    }
}
