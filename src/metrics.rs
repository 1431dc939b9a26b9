// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for Iris.
//!
//! All metrics carry the namespace prefix `iris_` and are exposed on `/metrics`.
//!
//! # Metrics Categories
//!
//! - **Write Metrics** - Label writes by outcome, unchanged resources, batch flushes
//! - **Enumeration Metrics** - Zone failures and `label_all` duration
//! - **Event Metrics** - Push events by dispatch outcome
//!
//! # Example
//!
//! ```rust,no_run
//! use iris::metrics::record_label_writes;
//!
//! // Three writes to instances were committed
//! record_label_writes("Instances", "committed", 3);
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all Iris metrics
const METRICS_NAMESPACE: &str = "iris";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Write Metrics
// ============================================================================

/// Total number of label writes by plugin and outcome
///
/// Labels:
/// - `plugin`: Plugin name (e.g., `Instances`, `Buckets`)
/// - `outcome`: `committed` or `failed`
pub static LABEL_WRITES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_label_writes_total"),
        "Total number of label writes by plugin and outcome",
    );
    let counter = CounterVec::new(opts, &["plugin", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of resources found already carrying every label
///
/// Labels:
/// - `plugin`: Plugin name
pub static RESOURCES_UNCHANGED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resources_unchanged_total"),
        "Total number of resources whose labels were already up to date",
    );
    let counter = CounterVec::new(opts, &["plugin"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of batch requests sent
///
/// Labels:
/// - `plugin`: Plugin name
pub static BATCH_FLUSHES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_batch_flushes_total"),
        "Total number of batch requests sent by plugin",
    );
    let counter = CounterVec::new(opts, &["plugin"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Enumeration Metrics
// ============================================================================

/// Total number of zones that could not be listed
///
/// Labels:
/// - `plugin`: Plugin name
pub static ZONE_FAILURES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_zone_failures_total"),
        "Total number of zone listings that failed by plugin",
    );
    let counter = CounterVec::new(opts, &["plugin"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of `label_all` passes in seconds
///
/// Labels:
/// - `plugin`: Plugin name
pub static LABEL_ALL_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_label_all_duration_seconds"),
        "Duration of label_all passes in seconds by plugin",
    )
    .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 3600.0]);
    let histogram = HistogramVec::new(opts, &["plugin"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Event Metrics
// ============================================================================

/// Total number of push events by outcome
///
/// Labels:
/// - `outcome`: `labeled`, `unresolved`, `failed`, `not_reactive`, `ignored`, `skipped`,
///   `ambiguous`, `rejected`
pub static EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_events_total"),
        "Total number of log events received by dispatch outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record label writes
///
/// # Arguments
/// * `plugin` - Plugin that issued the writes
/// * `outcome` - `committed` or `failed`
/// * `count` - Number of writes
#[allow(clippy::cast_precision_loss)]
pub fn record_label_writes(plugin: &str, outcome: &str, count: usize) {
    LABEL_WRITES_TOTAL
        .with_label_values(&[plugin, outcome])
        .inc_by(count as f64);
}

/// Record a resource that needed no write
pub fn record_unchanged(plugin: &str) {
    RESOURCES_UNCHANGED_TOTAL.with_label_values(&[plugin]).inc();
}

/// Record a batch request
pub fn record_batch_flush(plugin: &str) {
    BATCH_FLUSHES_TOTAL.with_label_values(&[plugin]).inc();
}

/// Record a zone that could not be listed
pub fn record_zone_failure(plugin: &str) {
    ZONE_FAILURES_TOTAL.with_label_values(&[plugin]).inc();
}

/// Record the duration of a `label_all` pass
///
/// # Arguments
/// * `plugin` - Plugin that ran the pass
/// * `duration` - Wall-clock time of the pass, final flush included
pub fn record_label_all_duration(plugin: &str, duration: Duration) {
    LABEL_ALL_DURATION_SECONDS
        .with_label_values(&[plugin])
        .observe(duration.as_secs_f64());
}

/// Record how a push event was dispatched
pub fn record_event(outcome: &str) {
    EVENTS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Gather all metrics in Prometheus text format
///
/// # Errors
///
/// Returns an error if metrics encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_label_writes() {
        record_label_writes("MetricsTestPlugin", "committed", 3);
        record_label_writes("MetricsTestPlugin", "failed", 1);

        let committed = LABEL_WRITES_TOTAL.with_label_values(&["MetricsTestPlugin", "committed"]);
        assert!(committed.get() >= 3.0);
        let failed = LABEL_WRITES_TOTAL.with_label_values(&["MetricsTestPlugin", "failed"]);
        assert!(failed.get() >= 1.0);
    }

    #[test]
    fn test_record_label_all_duration() {
        record_label_all_duration("DurationTestPlugin", Duration::from_millis(250));
        let histogram = LABEL_ALL_DURATION_SECONDS.with_label_values(&["DurationTestPlugin"]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_gather_metrics() {
        record_event("labeled");
        record_zone_failure("GatherTestPlugin");

        let metrics_text = gather_metrics().unwrap();
        assert!(
            metrics_text.contains("iris_events_total"),
            "Metrics should contain event counter"
        );
        assert!(metrics_text.contains("iris_zone_failures_total"));
    }
}
