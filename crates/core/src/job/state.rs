//! Per-job state machine and the in-flight job registry.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

use super::types::JobId;

/// Resource that caused an admission rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectedResource {
    Thermal,
    Memory,
}

/// Lifecycle state of one job.
///
/// ```text
/// Queued -> Admitted -> Fetching -> Resolved -> Delivered
///                  \          \           \
///                   +----------+-----------+--> Failed
/// Queued -> Rejected
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Admitted,
    Fetching,
    Resolved,
    Delivered,
    Failed { reason: String },
    Rejected { resource: RejectedResource },
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Admitted => "admitted",
            JobState::Fetching => "fetching",
            JobState::Resolved => "resolved",
            JobState::Delivered => "delivered",
            JobState::Failed { .. } => "failed",
            JobState::Rejected { .. } => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Delivered | JobState::Failed { .. } | JobState::Rejected { .. }
        )
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: &JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Queued, Admitted)
                | (Queued, Rejected { .. })
                | (Admitted, Fetching)
                | (Admitted, Failed { .. })
                | (Fetching, Resolved)
                | (Fetching, Failed { .. })
                | (Resolved, Delivered)
                | (Resolved, Failed { .. })
        )
    }
}

/// Registry of jobs currently held by workers, keyed by job id.
#[derive(Debug, Default)]
pub struct JobTracker {
    jobs: RwLock<HashMap<JobId, JobState>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly dequeued job in the `Queued` state.
    pub fn begin(&self, id: &JobId) {
        if let Ok(mut jobs) = self.jobs.write() {
            jobs.insert(id.clone(), JobState::Queued);
        }
    }

    /// Move a job to `next`. Illegal transitions are logged and ignored.
    pub fn transition(&self, id: &JobId, next: JobState) -> bool {
        let Ok(mut jobs) = self.jobs.write() else {
            return false;
        };
        match jobs.get_mut(id) {
            Some(current) if current.can_transition_to(&next) => {
                *current = next;
                true
            }
            Some(current) => {
                warn!(
                    job_id = %id,
                    from = current.name(),
                    to = next.name(),
                    "Ignoring illegal job state transition"
                );
                false
            }
            None => false,
        }
    }

    pub fn state(&self, id: &JobId) -> Option<JobState> {
        self.jobs.read().ok()?.get(id).cloned()
    }

    /// Drop a job from the registry once its outcome has been handled.
    pub fn finish(&self, id: &JobId) -> Option<JobState> {
        self.jobs.write().ok()?.remove(id)
    }

    pub fn snapshot(&self) -> Vec<(JobId, JobState)> {
        self.jobs
            .read()
            .map(|jobs| {
                jobs.iter()
                    .map(|(id, state)| (id.clone(), state.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
