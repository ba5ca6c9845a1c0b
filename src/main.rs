// ==========================================
// 出库单自动指派系统 - 主入口
// ==========================================
// 技术栈: Rust + SQLite
// 运行形态: 常驻调度进程（定时清扫等待出库单并重试指派）
// ==========================================

use shipment_autoassign::app::{get_default_db_path, AppState};
use shipment_autoassign::logging;

#[tokio::main]
async fn main() {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", shipment_autoassign::APP_NAME);
    tracing::info!("系统版本: {}", shipment_autoassign::VERSION);
    tracing::info!("==================================================");

    // 数据库路径: 第一个命令行参数，缺省用系统数据目录
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState
    let app_state = AppState::new(db_path).expect("无法初始化AppState");

    // 常驻调度循环（清扫任务已在 AppState 中注册）
    app_state.scheduler.run_forever().await;
}
