// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for dnssteer.
//!
//! All metrics use the namespace prefix `dnssteer_`.
//!
//! # Metrics Categories
//!
//! - **Cycle Metrics** - reconciliation cycles and their outcomes
//! - **Action Metrics** - assign/unassign actions applied or failed
//! - **Provider Metrics** - retries against the DNS provider
//! - **State Gauges** - healthy servers and published records after each cycle
//!
//! # Example
//!
//! ```rust,no_run
//! use dnssteer::metrics::record_cycle_success;
//!
//! record_cycle_success(std::time::Duration::from_secs(1));
//! ```

use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics
const METRICS_NAMESPACE: &str = "dnssteer";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via the `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register<C: prometheus::core::Collector + Clone + 'static>(collector: C) -> C {
    // Registration only fails on duplicate names, which are fixed at compile time
    let _ = METRICS_REGISTRY.register(Box::new(collector.clone()));
    collector
}

// ============================================================================
// Cycle Metrics
// ============================================================================

/// Total number of reconciliation cycles by status
///
/// Labels:
/// - `status`: Outcome (`success`, `error`)
pub static CYCLES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_cycles_total"),
        "Total number of reconciliation cycles by status",
    );
    register(CounterVec::new(opts, &["status"]).expect("valid metric definition"))
});

/// Duration of reconciliation cycles in seconds
pub static CYCLE_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_cycle_duration_seconds"),
        "Duration of reconciliation cycles in seconds",
    )
    .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    register(Histogram::with_opts(opts).expect("valid metric definition"))
});

// ============================================================================
// Action Metrics
// ============================================================================

/// Total number of planned actions by kind and outcome
///
/// Labels:
/// - `kind`: `assign` or `unassign`
/// - `status`: `success`, `error`, `skipped`
pub static ACTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_actions_total"),
        "Total number of record actions by kind and status",
    );
    register(CounterVec::new(opts, &["kind", "status"]).expect("valid metric definition"))
});

// ============================================================================
// Provider Metrics
// ============================================================================

/// Total number of provider call retries
///
/// Labels:
/// - `operation`: `list`, `create`, `delete`
pub static PROVIDER_RETRIES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_provider_retries_total"),
        "Total number of DNS provider call retries by operation",
    );
    register(CounterVec::new(opts, &["operation"]).expect("valid metric definition"))
});

// ============================================================================
// State Gauges
// ============================================================================

/// Number of healthy servers after the latest cycle
pub static HEALTHY_SERVERS: LazyLock<IntGauge> = LazyLock::new(|| {
    register(
        IntGauge::new(
            format!("{METRICS_NAMESPACE}_healthy_servers"),
            "Number of servers healthy in the latest cycle",
        )
        .expect("valid metric definition"),
    )
});

/// Number of published records after the latest cycle
pub static PUBLISHED_RECORDS: LazyLock<IntGauge> = LazyLock::new(|| {
    register(
        IntGauge::new(
            format!("{METRICS_NAMESPACE}_published_records"),
            "Number of configured servers published after the latest cycle",
        )
        .expect("valid metric definition"),
    )
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a completed reconciliation cycle.
pub fn record_cycle_success(duration: Duration) {
    CYCLES_TOTAL.with_label_values(&["success"]).inc();
    CYCLE_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record a cycle aborted before planning (e.g. ground truth unavailable).
pub fn record_cycle_error(duration: Duration) {
    CYCLES_TOTAL.with_label_values(&["error"]).inc();
    CYCLE_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record the outcome of one action.
pub fn record_action(kind: &str, status: &str) {
    ACTIONS_TOTAL.with_label_values(&[kind, status]).inc();
}

/// Record one retry of a provider call.
pub fn record_provider_retry(operation: &str) {
    PROVIDER_RETRIES_TOTAL.with_label_values(&[operation]).inc();
}

/// Update the state gauges.
pub fn set_state(healthy: usize, published: usize) {
    HEALTHY_SERVERS.set(i64::try_from(healthy).unwrap_or(i64::MAX));
    PUBLISHED_RECORDS.set(i64::try_from(published).unwrap_or(i64::MAX));
}

/// Gather all metrics in Prometheus text format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
