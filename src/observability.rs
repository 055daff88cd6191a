use std::net::SocketAddr;

use crate::engine::EngineError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings committed.
pub const BOOKINGS_TOTAL: &str = "stayd_bookings_total";

/// Counter: booking attempts rejected. Labels: reason.
pub const BOOKING_REJECTIONS_TOTAL: &str = "stayd_booking_rejections_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "stayd_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "stayd_wal_flush_batch_size";

/// Gauge: rows per table. Labels: table.
pub const TABLE_ROWS: &str = "stayd_table_rows";

/// Counter: analytics events collected off the notify hub.
pub const STATS_EVENTS_TOTAL: &str = "stayd_stats_events_total";

/// Counter: notify-hub messages the collector missed to lag.
pub const STATS_LAGGED_TOTAL: &str = "stayd_stats_lagged_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a rejection to a short label for metrics.
pub fn error_label(e: &EngineError) -> &'static str {
    match e {
        EngineError::NotFound(_) => "not_found",
        EngineError::DuplicateUser { .. } => "duplicate_user",
        EngineError::HasRooms(_) => "has_rooms",
        EngineError::HasBookings(_) => "has_bookings",
        EngineError::InvalidDateRange { .. } => "invalid_date_range",
        EngineError::PastDate(_) => "past_date",
        EngineError::DateConflict { .. } => "date_conflict",
        EngineError::Invalid(_) => "invalid_fields",
        EngineError::LimitExceeded(_) => "limit_exceeded",
        EngineError::WalError(_) => "wal_error",
    }
}
