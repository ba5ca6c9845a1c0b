// ==========================================
// 出库单自动指派系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ShipmentApi, WizardApi};
use crate::config::ConfigManager;
use crate::db;
use crate::importer::CsvStockImporter;
use crate::repository::{
    CronTaskRepository, LocationRepository, ProductRepository, ShipmentRepository,
    StockMoveRepository, WizardSessionRepository,
};
use crate::services::{AssignService, AssignSweepService, CronScheduler, SessionCleanupJob, SweepJob};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 出库单API
    pub shipment_api: Arc<ShipmentApi>,

    /// 指派向导API
    pub wizard_api: Arc<WizardApi>,

    /// 定时清扫服务
    pub sweep_service: Arc<AssignSweepService>,

    /// 定时任务调度器（已注册清扫任务）
    pub scheduler: Arc<CronScheduler>,

    /// CSV 导入器
    pub importer: Arc<CsvStockImporter>,

    /// 配置管理器
    pub config: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库连接并应用统一 PRAGMA
    /// 2. 初始化 schema（幂等），播种清扫任务 cron 条目
    /// 3. 初始化所有 Repository / Service / API 实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        db::init_schema(&conn).map_err(|e| format!("schema 初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // Repository 层
        // ==========================================
        let location_repo = Arc::new(LocationRepository::from_connection(conn.clone()));
        let product_repo = Arc::new(ProductRepository::from_connection(conn.clone()));
        let shipment_repo = Arc::new(ShipmentRepository::from_connection(conn.clone()));
        let move_repo = Arc::new(StockMoveRepository::from_connection(conn.clone()));
        let cron_repo = Arc::new(CronTaskRepository::from_connection(conn.clone()));
        let session_repo = Arc::new(WizardSessionRepository::from_connection(conn.clone()));

        // ==========================================
        // 配置 / 服务层
        // ==========================================
        let config = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("配置管理器初始化失败: {}", e))?,
        );
        let assign = Arc::new(AssignService::from_connection(conn.clone()));
        let sweep_service = Arc::new(AssignSweepService::new(
            cron_repo.clone(),
            location_repo.clone(),
            move_repo.clone(),
            shipment_repo.clone(),
            assign.clone(),
        ));

        let poll_seconds = config
            .scheduler_poll_seconds()
            .map_err(|e| format!("读取调度配置失败: {}", e))?;
        let mut scheduler = CronScheduler::new(cron_repo.clone(), poll_seconds);
        scheduler.register(
            db::ASSIGN_TRY_CRON_TASK_ID,
            Arc::new(SweepJob::new(sweep_service.clone())),
        );
        scheduler.register(
            db::WIZARD_SESSION_CLEANUP_CRON_TASK_ID,
            Arc::new(SessionCleanupJob::new(session_repo.clone())),
        );
        let scheduler = Arc::new(scheduler);

        // ==========================================
        // API 层
        // ==========================================
        let shipment_api = Arc::new(ShipmentApi::new(shipment_repo.clone(), assign.clone()));
        let wizard_api = Arc::new(WizardApi::new(
            session_repo,
            shipment_repo.clone(),
            assign,
            config.clone(),
        ));

        let importer = Arc::new(CsvStockImporter::new(
            location_repo,
            product_repo,
            shipment_repo,
            move_repo,
        ));

        tracing::info!("AppState初始化成功");
        Ok(Self {
            db_path,
            shipment_api,
            wizard_api,
            sweep_service,
            scheduler,
            importer,
            config,
        })
    }
}

/// 默认数据库路径
///
/// 优先使用系统数据目录，取不到时回退到当前目录。
pub fn get_default_db_path() -> String {
    dirs::data_dir()
        .map(|dir| {
            let app_dir = dir.join("shipment-autoassign");
            if let Err(e) = std::fs::create_dir_all(&app_dir) {
                tracing::warn!("创建数据目录失败({}), 回退当前目录: {}", app_dir.display(), e);
                return "shipment_autoassign.db".to_string();
            }
            app_dir
                .join("shipment_autoassign.db")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "shipment_autoassign.db".to_string())
}
