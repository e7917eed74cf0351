//! Prometheus metrics for observability.
//!
//! This module provides the server's HTTP request metrics and the registry that
//! also carries the core queue, worker, and pipeline metrics.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "grabber_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("grabber_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "grabber_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Worker pool
// =============================================================================

/// Free admission permits (collected dynamically).
pub static ADMISSION_AVAILABLE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "grabber_admission_permits_available",
        "Admission permits not currently held",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Worker pool
    registry
        .register(Box::new(ADMISSION_AVAILABLE.clone()))
        .unwrap();

    // Core metrics (queue, workers, pipeline)
    for metric in grabber_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the pool as it is right now.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let pool = state.pool();
    ADMISSION_AVAILABLE.set(pool.admission().available_permits() as i64);
    if let Some(depth) = pool.status().queue_depth {
        grabber_core::metrics::QUEUE_DEPTH.set(depth as i64);
    }
}

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static REFERENCE_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[0-9a-f]{32}(/|$)").unwrap());
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/-?\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_SEGMENT.replace_all(path, "{id}");
    let result = REFERENCE_SEGMENT.replace_all(&result, "/{reference}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/jobs/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/jobs/{id}");
    }

    #[test]
    fn test_normalize_path_reference() {
        let path = "/api/v1/pending/0123456789abcdef0123456789abcdef/confirm";
        assert_eq!(normalize_path(path), "/api/v1/pending/{reference}/confirm");
    }

    #[test]
    fn test_normalize_path_requester() {
        assert_eq!(
            normalize_path("/api/v1/preferences/123456789/quality"),
            "/api/v1/preferences/{id}/quality"
        );
        assert_eq!(
            normalize_path("/api/v1/preferences/-100200300"),
            "/api/v1/preferences/{id}"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        ADMISSION_AVAILABLE.set(0);
        grabber_core::metrics::QUEUE_DEPTH.set(0);
        grabber_core::metrics::JOBS_IN_FLIGHT.set(0);
        grabber_core::metrics::JOBS_FINISHED
            .with_label_values(&["delivered"])
            .inc_by(0);

        let output = encode_metrics();

        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
        assert!(output.contains("grabber_http_requests_total"));
        assert!(output.contains("grabber_http_requests_in_flight"));
        assert!(output.contains("grabber_admission_permits_available"));
        assert!(output.contains("grabber_queue_depth"));
        assert!(output.contains("grabber_jobs_in_flight"));
        assert!(output.contains("grabber_jobs_finished_total"));
    }
}
