//! Types for the worker module.

use serde::Serialize;

use crate::job::{JobId, JobState};

/// A job currently held by a worker.
#[derive(Debug, Clone, Serialize)]
pub struct InFlightJob {
    pub job_id: JobId,
    #[serde(flatten)]
    pub state: JobState,
}

/// Snapshot of the worker pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub running: bool,
    pub worker_count: usize,
    /// Total admission permits.
    pub admission_capacity: usize,
    /// Permits not currently held.
    pub admission_available: usize,
    pub in_flight: Vec<InFlightJob>,
    /// Jobs that reached a terminal state since startup.
    pub total_processed: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub total_rejected: u64,
    /// Pending jobs across both lanes; `None` if the queue could not be read.
    pub queue_depth: Option<usize>,
}
