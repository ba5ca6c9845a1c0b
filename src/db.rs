// ==========================================
// 出库单自动指派系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表语句集中于此，应用与测试共用同一份 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 清扫任务在 cron_task 表中的固定标识
pub const ASSIGN_TRY_CRON_TASK_ID: &str = "cron_shipment_out_assign_try_scheduler";

/// 向导会话清理任务的固定标识
pub const WIZARD_SESSION_CLEANUP_CRON_TASK_ID: &str = "cron_wizard_session_cleanup";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// 所有建表语句使用 IF NOT EXISTS，可在已有库上安全重复执行。
/// 同时播种 global 配置作用域与清扫任务的 cron 条目。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS location (
            location_id TEXT PRIMARY KEY,
            code TEXT,
            name TEXT NOT NULL,
            location_type TEXT NOT NULL
                CHECK(location_type IN ('WAREHOUSE', 'STORAGE', 'CUSTOMER', 'SUPPLIER')),
            parent_id TEXT REFERENCES location(location_id),
            active INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_location_type ON location(location_type);
        CREATE INDEX IF NOT EXISTS idx_location_name ON location(name);

        CREATE TABLE IF NOT EXISTS product (
            product_id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS shipment_out (
            shipment_id TEXT PRIMARY KEY,
            number TEXT NOT NULL UNIQUE,
            warehouse_id TEXT NOT NULL REFERENCES location(location_id),
            customer_location_id TEXT REFERENCES location(location_id),
            state TEXT NOT NULL
                CHECK(state IN ('DRAFT', 'WAITING', 'ASSIGNED', 'DONE', 'CANCELLED')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_shipment_out_state ON shipment_out(state);
        CREATE INDEX IF NOT EXISTS idx_shipment_out_warehouse ON shipment_out(warehouse_id);

        CREATE TABLE IF NOT EXISTS stock_move (
            move_id TEXT PRIMARY KEY,
            shipment_id TEXT REFERENCES shipment_out(shipment_id),
            product_id TEXT NOT NULL REFERENCES product(product_id),
            from_location_id TEXT NOT NULL REFERENCES location(location_id),
            to_location_id TEXT NOT NULL REFERENCES location(location_id),
            quantity REAL NOT NULL CHECK(quantity > 0),
            state TEXT NOT NULL
                CHECK(state IN ('DRAFT', 'ASSIGNED', 'DONE', 'CANCELLED')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_stock_move_state ON stock_move(state);
        CREATE INDEX IF NOT EXISTS idx_stock_move_product ON stock_move(product_id);
        CREATE INDEX IF NOT EXISTS idx_stock_move_to_location ON stock_move(to_location_id);
        CREATE INDEX IF NOT EXISTS idx_stock_move_shipment ON stock_move(shipment_id);
        CREATE INDEX IF NOT EXISTS idx_stock_move_updated_at ON stock_move(updated_at);

        CREATE TABLE IF NOT EXISTS cron_task (
            task_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            interval_seconds INTEGER NOT NULL CHECK(interval_seconds > 0),
            next_call TEXT NOT NULL,
            args_json TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            last_run_at TEXT,
            last_error TEXT
        );

        CREATE TABLE IF NOT EXISTS wizard_session (
            session_id TEXT PRIMARY KEY,
            step TEXT NOT NULL
                CHECK(step IN ('START', 'SHIPMENTS', 'DONE', 'CANCELLED')),
            warehouse_id TEXT REFERENCES location(location_id),
            from_datetime TEXT,
            candidate_ids_json TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_wizard_session_expires ON wizard_session(expires_at);

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);
        "#,
    )?;

    // 播种清扫任务的 cron 条目（默认每日一次，从当前时间起算）
    conn.execute(
        r#"
        INSERT OR IGNORE INTO cron_task (task_id, name, interval_seconds, next_call, active)
        VALUES (?1, '出库单指派重试清扫', 86400, datetime('now'), 1)
        "#,
        [ASSIGN_TRY_CRON_TASK_ID],
    )?;

    // 播种向导会话清理任务（每小时一次）
    conn.execute(
        r#"
        INSERT OR IGNORE INTO cron_task (task_id, name, interval_seconds, next_call, active)
        VALUES (?1, '向导会话清理', 3600, datetime('now'), 1)
        "#,
        [WIZARD_SESSION_CLEANUP_CRON_TASK_ID],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
