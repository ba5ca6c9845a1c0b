// Small dev utility: trigger one assignment retry sweep without the daemon.
//
// Usage:
//   cargo run --bin run_assign_sweep -- [db_path] [warehouse_name ...]
//
// Any trailing arguments are treated as a warehouse-name filter.

use chrono::Utc;
use shipment_autoassign::app::AppState;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    shipment_autoassign::logging::init();

    let mut args = std::env::args().skip(1);
    let db_path = args
        .next()
        .unwrap_or_else(|| "shipment_autoassign.db".to_string());
    let warehouse_names: Vec<String> = args.collect();

    let state = AppState::new(db_path)?;
    let filter = if warehouse_names.is_empty() {
        None
    } else {
        Some(warehouse_names.as_slice())
    };

    let assigned = state.sweep_service.run(filter, Utc::now().naive_utc())?;
    println!("assigned={}", assigned.len());
    for shipment_id in assigned {
        println!("{}", shipment_id);
    }
    Ok(())
}
