//! Configuration for the worker pool.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of dispatch loops.
    #[serde(default = "default_count")]
    pub count: usize,

    /// Extra admission permits beyond `count`, for front-end work.
    #[serde(default = "default_admission_slack")]
    pub admission_slack: usize,

    /// Bounded wait on each queue lane per dequeue.
    #[serde(default = "default_lane_timeout_ms")]
    pub lane_timeout_ms: u64,

    /// Pause after a failed dequeue.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,

    /// Pause after a dequeue that found nothing.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,

    /// Pause of a worker after a thermal rejection.
    #[serde(default = "default_thermal_pause_ms")]
    pub thermal_pause_ms: u64,

    /// How long shutdown waits for workers before aborting them.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_count() -> usize {
    4
}

fn default_admission_slack() -> usize {
    2
}

fn default_lane_timeout_ms() -> u64 {
    1000
}

fn default_error_backoff_ms() -> u64 {
    1000
}

fn default_idle_backoff_ms() -> u64 {
    100
}

fn default_thermal_pause_ms() -> u64 {
    5000
}

fn default_shutdown_grace_ms() -> u64 {
    5000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            admission_slack: default_admission_slack(),
            lane_timeout_ms: default_lane_timeout_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            idle_backoff_ms: default_idle_backoff_ms(),
            thermal_pause_ms: default_thermal_pause_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl WorkerConfig {
    /// Total admission permits.
    pub fn admission_capacity(&self) -> usize {
        self.count + self.admission_slack
    }

    pub fn lane_timeout(&self) -> Duration {
        Duration::from_millis(self.lane_timeout_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn thermal_pause(&self) -> Duration {
        Duration::from_millis(self.thermal_pause_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Shrink every wait, for tests.
    pub fn with_fast_timings(mut self) -> Self {
        self.lane_timeout_ms = 10;
        self.error_backoff_ms = 10;
        self.idle_backoff_ms = 5;
        self.thermal_pause_ms = 10;
        self.shutdown_grace_ms = 1000;
        self
    }
}
