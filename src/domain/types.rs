// ==========================================
// 出库单自动指派系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 出库单状态 (Shipment State)
// ==========================================
// 生命周期: DRAFT → WAITING → ASSIGNED → DONE
// CANCELLED 为终态; ASSIGNED → WAITING 允许（撤销指派重新等待）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentState {
    Draft,     // 草稿
    Waiting,   // 等待库存
    Assigned,  // 已指派
    Done,      // 已完成
    Cancelled, // 已取消
}

impl fmt::Display for ShipmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ShipmentState {
    /// 从数据库字符串解析状态
    ///
    /// 数据库列带 CHECK 约束，未知取值仅在库被外部改写时出现，按 DRAFT 兜底。
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "WAITING" => ShipmentState::Waiting,
            "ASSIGNED" => ShipmentState::Assigned,
            "DONE" => ShipmentState::Done,
            "CANCELLED" => ShipmentState::Cancelled,
            _ => ShipmentState::Draft,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShipmentState::Draft => "DRAFT",
            ShipmentState::Waiting => "WAITING",
            ShipmentState::Assigned => "ASSIGNED",
            ShipmentState::Done => "DONE",
            ShipmentState::Cancelled => "CANCELLED",
        }
    }

    /// 是否允许转入 WAITING
    ///
    /// DRAFT 首次进入等待；ASSIGNED 撤销指派重新等待；WAITING 重复调用幂等。
    pub fn can_wait(&self) -> bool {
        matches!(
            self,
            ShipmentState::Draft | ShipmentState::Assigned | ShipmentState::Waiting
        )
    }
}

// ==========================================
// 库存移动状态 (Move State)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveState {
    Draft,     // 草稿（未分配的需求）
    Assigned,  // 已预留
    Done,      // 已完成（库存事实）
    Cancelled, // 已取消
}

impl fmt::Display for MoveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl MoveState {
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ASSIGNED" => MoveState::Assigned,
            "DONE" => MoveState::Done,
            "CANCELLED" => MoveState::Cancelled,
            _ => MoveState::Draft,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            MoveState::Draft => "DRAFT",
            MoveState::Assigned => "ASSIGNED",
            MoveState::Done => "DONE",
            MoveState::Cancelled => "CANCELLED",
        }
    }
}

// ==========================================
// 库位类型 (Location Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    Warehouse, // 仓库（顶层分组）
    Storage,   // 存储区
    Customer,  // 客户收货点
    Supplier,  // 供应商发货点
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl LocationType {
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "WAREHOUSE" => LocationType::Warehouse,
            "CUSTOMER" => LocationType::Customer,
            "SUPPLIER" => LocationType::Supplier,
            _ => LocationType::Storage,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            LocationType::Warehouse => "WAREHOUSE",
            LocationType::Storage => "STORAGE",
            LocationType::Customer => "CUSTOMER",
            LocationType::Supplier => "SUPPLIER",
        }
    }
}

// ==========================================
// 向导步骤 (Wizard Step)
// ==========================================
// 线性状态机: START → SHIPMENTS → DONE
// START/SHIPMENTS 均可取消进入 CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WizardStep {
    Start,     // 选择仓库与截止时间
    Shipments, // 复核/编辑候选出库单
    Done,      // 指派已执行
    Cancelled, // 已取消
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl WizardStep {
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "SHIPMENTS" => WizardStep::Shipments,
            "DONE" => WizardStep::Done,
            "CANCELLED" => WizardStep::Cancelled,
            _ => WizardStep::Start,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            WizardStep::Start => "START",
            WizardStep::Shipments => "SHIPMENTS",
            WizardStep::Done => "DONE",
            WizardStep::Cancelled => "CANCELLED",
        }
    }

    /// 是否为终态（终态会话不再接受任何操作）
    pub fn is_terminal(&self) -> bool {
        matches!(self, WizardStep::Done | WizardStep::Cancelled)
    }
}
