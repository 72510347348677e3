// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Hetzner Cloud auxiliary operator.
//!
//! All metrics use the namespace prefix `hcloud_aux_operator_`. They are only
//! exposed when `METRICS_BIND_ADDRESS` is set; otherwise the structured log
//! remains the sole output.
//!
//! # Example
//!
//! ```rust,no_run
//! use hcloud_aux_operator::metrics::record_resync;
//!
//! record_resync(std::time::Duration::from_millis(350));
//! ```

use axum::{http::StatusCode, routing::get, Router};
use prometheus::{
    Counter, CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{error, info};

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics
const METRICS_NAMESPACE: &str = "hcloud_aux_operator";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Remediation Metrics
// ============================================================================

/// Total number of remediation outcomes
///
/// Labels:
/// - `attachment`: `network` or `firewall`
/// - `outcome`: `skipped`, `attached` or `failed`
pub static REMEDIATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_remediations_total"),
        "Total number of remediation outcomes by attachment kind",
    );
    let counter = CounterVec::new(opts, &["attachment", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Configured targets that could not be found during the latest check
///
/// Labels:
/// - `attachment`: `network` or `firewall`
pub static MISSING_TARGETS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_missing_targets"),
        "Configured networks or firewalls not found in Hetzner Cloud",
    );
    let gauge = GaugeVec::new(opts, &["attachment"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Loop Metrics
// ============================================================================

/// Node events seen by the network loop
///
/// Labels:
/// - `event`: `added`, `modified` or `deleted`
pub static NODE_EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_node_events_total"),
        "Total number of node watch events by kind",
    );
    let counter = CounterVec::new(opts, &["event"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Hosts whose Hetzner server could not be resolved
///
/// Labels:
/// - `source`: `node` or `extra_host`
pub static RESOLUTION_FAILURES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resolution_failures_total"),
        "Total number of hosts without a matching Hetzner server",
    );
    let counter = CounterVec::new(opts, &["source"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Completed firewall resync passes
pub static RESYNC_PASSES_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    let counter = Counter::new(
        format!("{METRICS_NAMESPACE}_firewall_resyncs_total"),
        "Total number of completed firewall resync passes",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of firewall resync passes in seconds
pub static RESYNC_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_firewall_resync_duration_seconds"),
        "Duration of firewall resync passes in seconds",
    )
    .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Recording helpers
// ============================================================================

/// Record the outcome of one remediation attempt.
pub fn record_remediation(attachment: &str, outcome: &str) {
    REMEDIATIONS_TOTAL
        .with_label_values(&[attachment, outcome])
        .inc();
}

/// Record the number of configured targets found missing.
#[allow(clippy::cast_precision_loss)]
pub fn set_missing_targets(attachment: &str, missing: usize) {
    MISSING_TARGETS
        .with_label_values(&[attachment])
        .set(missing as f64);
}

/// Record a node watch event.
pub fn record_node_event(event: &str) {
    NODE_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

/// Record a host whose server could not be resolved.
pub fn record_resolution_failure(source: &str) {
    RESOLUTION_FAILURES_TOTAL.with_label_values(&[source]).inc();
}

/// Record a completed firewall resync pass.
pub fn record_resync(duration: Duration) {
    RESYNC_PASSES_TOTAL.inc();
    RESYNC_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Gather all metrics in Prometheus text format.
///
/// # Errors
///
/// Returns an error if metrics encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Router exposing `GET /metrics`.
pub fn metrics_router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serve `/metrics` until the process exits.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_metrics(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Serving Prometheus metrics on /metrics");
    axum::serve(listener, metrics_router()).await
}
