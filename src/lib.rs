// ==========================================
// 出库单自动指派系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 仓储出库单库存分配重试服务
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分配规则
pub mod engine;

// 服务层 - 指派/清扫/调度
pub mod services;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配与入口
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{LocationType, MoveState, ShipmentState, WizardStep};

// 领域实体
pub use domain::{CronTask, Location, Product, ShipmentOut, StockMove, WizardSession};

// 引擎
pub use engine::{AllocationPlan, AllocationPlanner, MoveDemand};

// 服务
pub use services::{
    AssignService, AssignSweepService, CronJob, CronScheduler, SessionCleanupJob, SweepJob,
};

// API
pub use api::{ShipmentApi, WizardApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "出库单自动指派系统";
