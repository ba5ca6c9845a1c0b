// ==========================================
// 出库单自动指派系统 - 分配规划引擎
// ==========================================
// 职责: 依据可用量决定哪些需求行可以预留
// 红线: Engine 不拼 SQL
// ==========================================

use std::collections::HashMap;

/// 浮点数量比较的容差
const QTY_EPSILON: f64 = 1e-9;

/// 一条待分配的需求行（出库单下的草稿移动）
#[derive(Debug, Clone, PartialEq)]
pub struct MoveDemand {
    /// 移动 ID
    pub move_id: String,

    /// 产品 ID
    pub product_id: String,

    /// 需求数量
    pub quantity: f64,
}

/// 分配规划结果
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    /// 可预留的移动 ID（按需求行顺序）
    pub assignable_move_ids: Vec<String>,

    /// 是否全部需求行都能覆盖
    pub fully_assignable: bool,
}

/// 分配规划器
///
/// 按需求行的创建顺序贪心消耗可用量：
/// 可用量足以覆盖整行则预留并扣减，不足则整行跳过（不做拆行）。
pub struct AllocationPlanner;

impl AllocationPlanner {
    /// 规划一张出库单的预留
    ///
    /// # 参数
    /// - demands: 需求行，按创建顺序
    /// - availability: 产品可用量（存储区在手量减去已预留量）
    ///
    /// # 返回
    /// - AllocationPlan: 可预留行与整单是否满足
    pub fn plan(demands: &[MoveDemand], availability: &HashMap<String, f64>) -> AllocationPlan {
        let mut remaining: HashMap<String, f64> = availability.clone();
        let mut assignable = Vec::new();
        let mut fully = true;

        for demand in demands {
            let available = remaining.get(&demand.product_id).copied().unwrap_or(0.0);
            if available + QTY_EPSILON >= demand.quantity {
                remaining.insert(demand.product_id.clone(), available - demand.quantity);
                assignable.push(demand.move_id.clone());
            } else {
                fully = false;
            }
        }

        AllocationPlan {
            assignable_move_ids: assignable,
            fully_assignable: fully,
        }
    }
}
