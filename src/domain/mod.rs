// ==========================================
// 出库单自动指派系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod cron;
pub mod location;
pub mod product;
pub mod shipment;
pub mod stock_move;
pub mod types;
pub mod wizard;

// 重导出核心类型
pub use cron::CronTask;
pub use location::{Location, OUTPUT_STAGING_CODE};
pub use product::Product;
pub use shipment::ShipmentOut;
pub use stock_move::StockMove;
pub use types::{LocationType, MoveState, ShipmentState, WizardStep};
pub use wizard::WizardSession;
