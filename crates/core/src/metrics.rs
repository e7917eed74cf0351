//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Queue (submissions, dequeues, depth)
//! - Worker pool (admission rejections, outcomes, in-flight jobs)
//! - Pipeline (fetch durations, artifact sizes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Queue
// =============================================================================

/// Jobs submitted, by lane.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("grabber_jobs_submitted_total", "Total jobs submitted"),
        &["lane"], // "high", "low"
    )
    .unwrap()
});

/// Jobs handed to a worker, by lane.
pub static JOBS_DEQUEUED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("grabber_jobs_dequeued_total", "Total jobs dequeued"),
        &["lane"],
    )
    .unwrap()
});

/// Pending jobs across both lanes, sampled by the workers.
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("grabber_queue_depth", "Jobs waiting in the queue").unwrap()
});

/// Dequeue attempts that failed with a storage error.
pub static DEQUEUE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("grabber_dequeue_errors_total", "Failed dequeue attempts"),
        &["kind"], // "storage", "serialization", "connection"
    )
    .unwrap()
});

// =============================================================================
// Worker pool
// =============================================================================

/// Admission rejections by resource.
pub static ADMISSION_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "grabber_admission_rejections_total",
            "Jobs rejected by the resource gate",
        ),
        &["resource"], // "thermal", "memory"
    )
    .unwrap()
});

/// Finished jobs by outcome.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("grabber_jobs_finished_total", "Jobs that reached a terminal state"),
        &["outcome"], // "delivered", "rejected", or a failure reason
    )
    .unwrap()
});

/// Jobs currently held by workers.
pub static JOBS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("grabber_jobs_in_flight", "Jobs currently being processed").unwrap()
});

// =============================================================================
// Pipeline
// =============================================================================

/// Fetch tool run time in seconds.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("grabber_fetch_duration_seconds", "Duration of fetch tool runs")
            .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["platform", "result"],
    )
    .unwrap()
});

/// Size of delivered artifacts in bytes.
pub static ARTIFACT_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("grabber_artifact_bytes", "Size of resolved artifacts")
            .buckets(prometheus::exponential_buckets(1_048_576.0, 4.0, 7).unwrap()),
        &["media_kind"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Queue
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_DEQUEUED.clone()),
        Box::new(QUEUE_DEPTH.clone()),
        Box::new(DEQUEUE_ERRORS.clone()),
        // Worker pool
        Box::new(ADMISSION_REJECTIONS.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOBS_IN_FLIGHT.clone()),
        // Pipeline
        Box::new(FETCH_DURATION.clone()),
        Box::new(ARTIFACT_BYTES.clone()),
    ]
}
