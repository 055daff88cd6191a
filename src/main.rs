use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use stayd::compactor;
use stayd::engine::Engine;
use stayd::notify::NotifyHub;
use stayd::seed;
use stayd::stats::{self, StatsStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("STAYD_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    stayd::observability::init(metrics_port);

    let data_dir = std::env::var("STAYD_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let compact_threshold: u64 = std::env::var("STAYD_COMPACT_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);
    let seed_enabled = std::env::var("STAYD_SEED").is_ok_and(|s| s == "true" || s == "1");
    let export_dir: Option<PathBuf> = std::env::var("STAYD_EXPORT_DIR").ok().map(PathBuf::from);

    std::fs::create_dir_all(&data_dir)?;
    let data_dir = PathBuf::from(data_dir);

    let notify = Arc::new(NotifyHub::new());
    let store = Arc::new(StatsStore::with_journal(&data_dir)?);
    // Subscribe before the first mutation so nothing is missed.
    let collector = tokio::spawn(stats::run_collector(store.clone(), notify.clone()));
    tokio::task::yield_now().await;

    let wal_path = data_dir.join("stayd.wal");
    let engine = Arc::new(Engine::new(wal_path, notify)?);

    if seed_enabled {
        seed::seed_demo_data(&engine, Utc::now().date_naive()).await?;
    }

    tokio::spawn(compactor::run_compactor(engine.clone(), compact_threshold));

    let (hotels, rooms, users, bookings) = engine.table_counts();
    for (table, rows) in [
        ("hotels", hotels),
        ("rooms", rooms),
        ("users", users),
        ("bookings", bookings),
    ] {
        metrics::gauge!(stayd::observability::TABLE_ROWS, "table" => table).set(rows as f64);
    }
    info!("stayd up");
    info!("  data_dir: {}", data_dir.display());
    info!("  tables: {hotels} hotels, {rooms} rooms, {users} users, {bookings} bookings");
    info!("  compact_threshold: {compact_threshold}");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    // Run until SIGTERM/ctrl-c, then export collected statistics if asked.
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    shutdown.await;
    info!("shutdown signal received");

    collector.abort();
    if let Some(dir) = export_dir {
        let (booked, registered) = store.counts();
        info!("exporting {booked} booking and {registered} registration events");
        if let Err(e) = store.export_csv(&dir) {
            tracing::error!("statistics export failed: {e}");
        }
    }

    info!("stayd stopped");
    Ok(())
}
