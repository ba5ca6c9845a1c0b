// Small dev utility: load CSV seed data into a database.
//
// Usage:
//   cargo run --bin seed_demo_data -- <db_path> <csv_dir>
//
// The directory may contain locations.csv / products.csv /
// shipments.csv / moves.csv; missing files are skipped.

use shipment_autoassign::app::AppState;
use shipment_autoassign::importer::StockDataImporter;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    shipment_autoassign::logging::init();

    let mut args = std::env::args().skip(1);
    let db_path = args.next().ok_or("缺少参数: <db_path>")?;
    let csv_dir: PathBuf = args.next().ok_or("缺少参数: <csv_dir>")?.into();

    let state = AppState::new(db_path)?;
    let summary = state.importer.import_dir(&csv_dir).await?;

    println!(
        "locations={} products={} shipments={} moves={}",
        summary.locations, summary.products, summary.shipments, summary.moves
    );
    Ok(())
}
