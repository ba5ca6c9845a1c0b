// ==========================================
// 出库单自动指派系统 - 库存数据导入器
// ==========================================
// 职责: 解析 CSV 基础数据并写入仓储层
// 文件约定（目录内按存在与否逐个导入）:
// - locations.csv: location_id,code,name,location_type,parent_id
// - products.csv:  product_id,code,name
// - shipments.csv: shipment_id,number,warehouse_id,customer_location_id,state,created_at
// - moves.csv:     move_id,shipment_id,product_id,from_location_id,to_location_id,
//                  quantity,state,created_at,updated_at
// ==========================================

use crate::domain::location::Location;
use crate::domain::product::Product;
use crate::domain::shipment::ShipmentOut;
use crate::domain::stock_move::StockMove;
use crate::domain::types::{LocationType, MoveState, ShipmentState};
use crate::importer::error::ImportError;
use crate::repository::{
    LocationRepository, ProductRepository, ShipmentRepository, StockMoveRepository,
    DATETIME_FORMAT,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// 导入汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub locations: usize,
    pub products: usize,
    pub shipments: usize,
    pub moves: usize,
}

/// 库存数据导入接口
#[async_trait]
pub trait StockDataImporter {
    /// 从目录导入全部可识别的 CSV 文件
    async fn import_dir(&self, dir: &Path) -> Result<ImportSummary, ImportError>;
}

// ==========================================
// CSV 行记录
// ==========================================

#[derive(Debug, Deserialize)]
struct LocationRecord {
    location_id: String,
    code: Option<String>,
    name: String,
    location_type: String,
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductRecord {
    product_id: String,
    code: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ShipmentRecord {
    shipment_id: String,
    number: String,
    warehouse_id: String,
    customer_location_id: Option<String>,
    state: String,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct MoveRecord {
    move_id: String,
    shipment_id: Option<String>,
    product_id: String,
    from_location_id: String,
    to_location_id: String,
    quantity: f64,
    state: String,
    created_at: String,
    updated_at: String,
}

// ==========================================
// CsvStockImporter - CSV 导入器
// ==========================================

/// CSV 库存数据导入器
pub struct CsvStockImporter {
    location_repo: Arc<LocationRepository>,
    product_repo: Arc<ProductRepository>,
    shipment_repo: Arc<ShipmentRepository>,
    move_repo: Arc<StockMoveRepository>,
}

impl CsvStockImporter {
    pub fn new(
        location_repo: Arc<LocationRepository>,
        product_repo: Arc<ProductRepository>,
        shipment_repo: Arc<ShipmentRepository>,
        move_repo: Arc<StockMoveRepository>,
    ) -> Self {
        Self {
            location_repo,
            product_repo,
            shipment_repo,
            move_repo,
        }
    }

    fn read_records<T: serde::de::DeserializeOwned>(
        path: &Path,
    ) -> Result<Vec<(usize, T)>, ImportError> {
        let display = path.display().to_string();
        let mut reader = csv::Reader::from_path(path).map_err(|e| match e.kind() {
            csv::ErrorKind::Io(_) => ImportError::Io {
                path: display.clone(),
                source: std::io::Error::other(e.to_string()),
            },
            _ => ImportError::Csv {
                path: display.clone(),
                row: 0,
                message: e.to_string(),
            },
        })?;

        let mut records = Vec::new();
        for (index, result) in reader.deserialize::<T>().enumerate() {
            // 第 1 行是表头，数据从第 2 行开始
            let row = index + 2;
            let record = result.map_err(|e| ImportError::Csv {
                path: display.clone(),
                row,
                message: e.to_string(),
            })?;
            records.push((row, record));
        }
        Ok(records)
    }

    fn parse_datetime_field(
        path: &Path,
        row: usize,
        field: &str,
        raw: &str,
    ) -> Result<NaiveDateTime, ImportError> {
        NaiveDateTime::parse_from_str(raw.trim(), DATETIME_FORMAT).map_err(|_| {
            ImportError::InvalidField {
                path: path.display().to_string(),
                row,
                field: field.to_string(),
                message: format!("无法解析时间戳: {}", raw),
            }
        })
    }

    /// 严格解析枚举字段（与数据库取值一一对应，未知取值报错）
    fn parse_enum_field<T>(
        path: &Path,
        row: usize,
        field: &str,
        raw: &str,
        parse: impl Fn(&str) -> T,
        to_db: impl Fn(&T) -> &'static str,
    ) -> Result<T, ImportError> {
        let value = parse(raw);
        if to_db(&value) != raw.trim().to_uppercase() {
            return Err(ImportError::InvalidField {
                path: path.display().to_string(),
                row,
                field: field.to_string(),
                message: format!("未知取值: {}", raw),
            });
        }
        Ok(value)
    }

    fn import_locations(&self, path: &Path) -> Result<usize, ImportError> {
        let records = Self::read_records::<LocationRecord>(path)?;
        let count = records.len();
        for (row, record) in records {
            let location_type = Self::parse_enum_field(
                path,
                row,
                "location_type",
                &record.location_type,
                LocationType::from_db_str,
                LocationType::to_db_str,
            )?;
            self.location_repo.insert(&Location {
                location_id: record.location_id,
                code: record.code,
                name: record.name,
                location_type,
                parent_id: record.parent_id,
                active: true,
            })?;
        }
        Ok(count)
    }

    fn import_products(&self, path: &Path) -> Result<usize, ImportError> {
        let records = Self::read_records::<ProductRecord>(path)?;
        let count = records.len();
        for (_row, record) in records {
            self.product_repo.insert(&Product {
                product_id: record.product_id,
                code: record.code,
                name: record.name,
            })?;
        }
        Ok(count)
    }

    fn import_shipments(&self, path: &Path) -> Result<usize, ImportError> {
        let records = Self::read_records::<ShipmentRecord>(path)?;
        let count = records.len();
        for (row, record) in records {
            let state = Self::parse_enum_field(
                path,
                row,
                "state",
                &record.state,
                ShipmentState::from_db_str,
                ShipmentState::to_db_str,
            )?;
            let created_at =
                Self::parse_datetime_field(path, row, "created_at", &record.created_at)?;
            self.shipment_repo.insert(&ShipmentOut {
                shipment_id: record.shipment_id,
                number: record.number,
                warehouse_id: record.warehouse_id,
                customer_location_id: record.customer_location_id,
                state,
                created_at,
                updated_at: created_at,
            })?;
        }
        Ok(count)
    }

    fn import_moves(&self, path: &Path) -> Result<usize, ImportError> {
        let records = Self::read_records::<MoveRecord>(path)?;
        let count = records.len();
        for (row, record) in records {
            let state = Self::parse_enum_field(
                path,
                row,
                "state",
                &record.state,
                MoveState::from_db_str,
                MoveState::to_db_str,
            )?;
            let created_at =
                Self::parse_datetime_field(path, row, "created_at", &record.created_at)?;
            let updated_at =
                Self::parse_datetime_field(path, row, "updated_at", &record.updated_at)?;
            if record.quantity <= 0.0 {
                return Err(ImportError::InvalidField {
                    path: path.display().to_string(),
                    row,
                    field: "quantity".to_string(),
                    message: format!("数量必须为正: {}", record.quantity),
                });
            }
            self.move_repo.insert(&StockMove {
                move_id: record.move_id,
                shipment_id: record.shipment_id,
                product_id: record.product_id,
                from_location_id: record.from_location_id,
                to_location_id: record.to_location_id,
                quantity: record.quantity,
                state,
                created_at,
                updated_at,
            })?;
        }
        Ok(count)
    }
}

#[async_trait]
impl StockDataImporter for CsvStockImporter {
    async fn import_dir(&self, dir: &Path) -> Result<ImportSummary, ImportError> {
        let mut summary = ImportSummary::default();

        // 依外键顺序导入: 库位 → 产品 → 出库单 → 移动
        let locations = dir.join("locations.csv");
        if locations.exists() {
            summary.locations = self.import_locations(&locations)?;
        }
        let products = dir.join("products.csv");
        if products.exists() {
            summary.products = self.import_products(&products)?;
        }
        let shipments = dir.join("shipments.csv");
        if shipments.exists() {
            summary.shipments = self.import_shipments(&shipments)?;
        }
        let moves = dir.join("moves.csv");
        if moves.exists() {
            summary.moves = self.import_moves(&moves)?;
        }

        tracing::info!(
            "导入完成: 库位 {}, 产品 {}, 出库单 {}, 移动 {}",
            summary.locations,
            summary.products,
            summary.shipments,
            summary.moves
        );
        Ok(summary)
    }
}
