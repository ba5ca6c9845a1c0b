// ==========================================
// 出库单自动指派系统 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod cron_repo;
pub mod error;
pub mod location_repo;
pub mod move_repo;
pub mod product_repo;
pub mod shipment_repo;
pub mod wizard_session_repo;

// 重导出核心仓储
pub use cron_repo::CronTaskRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use location_repo::LocationRepository;
pub use move_repo::StockMoveRepository;
pub use product_repo::ProductRepository;
pub use shipment_repo::ShipmentRepository;
pub use wizard_session_repo::WizardSessionRepository;

use chrono::{NaiveDate, NaiveDateTime};

/// 时间戳的统一存储格式（TEXT，可与 datetime('now') 字典序比较）
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 格式化时间戳为数据库字符串
pub(crate) fn format_datetime(t: NaiveDateTime) -> String {
    t.format(DATETIME_FORMAT).to_string()
}

/// 解析数据库时间戳字符串（解析失败回退到 epoch，列值由应用统一写入）
pub(crate) fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).unwrap_or_else(|_| {
        NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    })
}

/// 构建 `IN (?,?,...)` 的占位符列表
pub(crate) fn sql_placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}
