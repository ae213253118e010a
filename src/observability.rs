use std::net::SocketAddr;

// ── Generation runs ─────────────────────────────────────────────

/// Counter: seating generation runs. Labels: status (ok, error).
pub const GENERATIONS_TOTAL: &str = "seatplan_generations_total";

/// Histogram: end-to-end generation latency in seconds, including the commit.
pub const GENERATION_DURATION_SECONDS: &str = "seatplan_generation_duration_seconds";

/// Counter: students given a seat across all runs.
pub const STUDENTS_ASSIGNED_TOTAL: &str = "seatplan_students_assigned_total";

/// Counter: students left without a seat across all runs.
pub const STUDENTS_UNASSIGNED_TOTAL: &str = "seatplan_students_unassigned_total";

// ── Store ───────────────────────────────────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "seatplan_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "seatplan_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
