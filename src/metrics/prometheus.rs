use std::net::SocketAddr;

use anyhow::Context;
use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus HTTP exporter on `addr`.
/// After this call, any metrics recorded via the `metrics` crate
/// macros (counter!, histogram!) are automatically exported at /metrics.
/// Without it the macros are no-ops.
pub fn init_metrics_server(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("failed to start Prometheus metrics server on {addr}"))
}

// ── Fetch metrics ────────────────────────────────────────────────

pub fn record_fetch(feed: &str, outcome: &str) {
    counter!("fetch_requests_total", "feed" => feed.to_string(), "outcome" => outcome.to_string())
        .increment(1);
}

pub fn record_fetch_failure(feed: &str, reason: &str) {
    counter!("fetch_failures_total", "feed" => feed.to_string(), "reason" => reason.to_string())
        .increment(1);
}

pub fn record_fetch_latency_ms(feed: &str, latency_ms: f64) {
    histogram!("fetch_latency_ms", "feed" => feed.to_string())
        .record(latency_ms);
}

// ── Store metrics ────────────────────────────────────────────────

pub fn record_store_write() {
    counter!("store_writes_total").increment(1);
}

pub fn record_store_failure(reason: &str) {
    counter!("store_failures_total", "reason" => reason.to_string())
        .increment(1);
}

// ── Cycle metrics ────────────────────────────────────────────────

pub fn record_cycle(mode: &str) {
    counter!("cycles_total", "mode" => mode.to_string())
        .increment(1);
}
