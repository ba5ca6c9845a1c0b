// ==========================================
// 出库单自动指派系统 - 引擎层
// ==========================================
// 职责: 实现分配规则,不拼 SQL
// ==========================================

pub mod assign;

// 重导出核心引擎
pub use assign::{AllocationPlan, AllocationPlanner, MoveDemand};
