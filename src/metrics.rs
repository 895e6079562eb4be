// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the API Gateway operator.
//!
//! All metrics use the namespace prefix `operator_kyma_project_io_`
//! (prometheus-safe version of "operator.kyma-project.io").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - passes, their outcome and duration
//! - **Resource Lifecycle Metrics** - owned resources created, updated and deleted
//! - **Safety Metrics** - foreign resources blocking a teardown, status write conflicts
//!
//! # Example
//!
//! ```rust,no_run
//! use api_gateway_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("APIGateway", std::time::Duration::from_secs(1));
//! ```

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "operator_kyma_project_io";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (always `APIGateway` today)
/// - `status`: Outcome (`success`, `warning`, `error`, `skipped`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Resource Lifecycle Metrics
// ============================================================================

/// Owned resource writes by kind and operation (`created`, `updated`, `deleted`)
pub static RESOURCE_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resource_operations_total"),
        "Total number of owned resource writes by kind and operation",
    );
    let counter = CounterVec::new(opts, &["kind", "operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Safety Metrics
// ============================================================================

/// Foreign resources currently blocking a teardown, by finalizer
pub static BLOCKING_RESOURCES: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_blocking_resources"),
        "Number of foreign resources blocking deletion, by finalizer",
    );
    let gauge = GaugeVec::new(opts, &["finalizer"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Status writes rejected because of a stale resource version
pub static STATUS_CONFLICTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_status_conflicts_total"),
        "Total number of conflicting status writes by resource type",
    );
    let counter = CounterVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Record a successful reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    record_reconciliation(resource_type, "success", duration);
}

/// Record a reconciliation that ended in `Warning`
pub fn record_reconciliation_warning(resource_type: &str, duration: Duration) {
    record_reconciliation(resource_type, "warning", duration);
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    record_reconciliation(resource_type, "error", duration);
}

/// Record a pass that stopped early (object gone or not responsible)
pub fn record_reconciliation_skipped(resource_type: &str, duration: Duration) {
    record_reconciliation(resource_type, "skipped", duration);
}

fn record_reconciliation(resource_type: &str, status: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, status])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record an owned resource write
///
/// # Arguments
/// * `kind` - Kind of the owned resource (e.g., `Gateway`)
/// * `operation` - `created`, `updated` or `deleted`
pub fn record_resource_operation(kind: &str, operation: &str) {
    RESOURCE_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

/// Record the number of foreign resources blocking a finalizer
#[allow(clippy::cast_precision_loss)]
pub fn record_blocking_resources(finalizer: &str, count: usize) {
    BLOCKING_RESOURCES
        .with_label_values(&[finalizer])
        .set(count as f64);
}

/// Record a conflicting status write
pub fn record_status_conflict(resource_type: &str) {
    STATUS_CONFLICTS_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
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
    fn test_record_reconciliation_warning() {
        let resource_type = "WarningTest";
        record_reconciliation_warning(resource_type, Duration::from_millis(20));

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "warning"]);
        assert!(counter.get() > 0.0);
        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[resource_type]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_blocking_resources_sets_gauge() {
        record_blocking_resources("test/finalizer", 3);
        let gauge = BLOCKING_RESOURCES.with_label_values(&["test/finalizer"]);
        #[allow(clippy::float_cmp)]
        {
            assert_eq!(gauge.get(), 3.0);
        }
        record_blocking_resources("test/finalizer", 0);
        #[allow(clippy::float_cmp)]
        {
            assert_eq!(gauge.get(), 0.0);
        }
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("GatherTest", Duration::from_millis(100));
        record_resource_operation("GatherKind", "created");

        let metrics_text = gather_metrics().unwrap();
        assert!(metrics_text.contains("operator_kyma_project_io"));
        assert!(metrics_text.contains("reconciliations_total"));
        assert!(metrics_text.contains("resource_operations_total"));
    }
}
