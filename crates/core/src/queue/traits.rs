//! Queue trait and error types.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::job::{Job, Priority};

/// Errors raised by queue backends.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The backing store could not be opened. Fatal at startup.
    #[error("Failed to open queue store: {0}")]
    Connection(String),

    /// A read or write against the store failed.
    #[error("Queue storage error: {0}")]
    Storage(String),

    /// A job record could not be encoded or decoded.
    #[error("Job serialization error: {0}")]
    Serialization(String),
}

/// One of the two sub-queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    High,
    Low,
}

impl Lane {
    /// Order in which lanes are polled on every dequeue.
    pub const POLL_ORDER: [Lane; 2] = [Lane::High, Lane::Low];

    pub fn for_priority(priority: Priority) -> Self {
        match priority {
            Priority::High => Lane::High,
            Priority::Low => Lane::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::High => "high",
            Lane::Low => "low",
        }
    }
}

/// Durable two-lane job queue.
///
/// Within a lane jobs come out in enqueue order. Across lanes the high lane is
/// always preferred: a dequeue waits up to `lane_timeout` on the high lane and only
/// then up to `lane_timeout` on the low lane. Every queued job is handed to at most
/// one caller.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a job to the lane matching its priority.
    fn enqueue(&self, job: &Job) -> Result<(), QueueError>;

    /// Take the next job, or `None` when both bounded waits came up empty.
    async fn dequeue(&self, lane_timeout: Duration) -> Result<Option<Job>, QueueError>;

    /// Number of jobs waiting in one lane.
    fn lane_len(&self, lane: Lane) -> Result<usize, QueueError>;

    /// Total number of jobs waiting across both lanes.
    fn status(&self) -> Result<usize, QueueError> {
        let mut total = 0;
        for lane in Lane::POLL_ORDER {
            total += self.lane_len(lane)?;
        }
        Ok(total)
    }
}
