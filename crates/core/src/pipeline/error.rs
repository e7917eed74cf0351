//! Error types for the execution pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::delivery::{DeliveryError, Notice};
use crate::fetcher::{FetchError, FetchFailureKind};
use crate::job::MediaKind;

/// Errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[source] FetchError),

    /// The tool reported success but no artifact could be located.
    #[error("Downloaded file not found in {dir}")]
    ArtifactNotFound { dir: PathBuf },

    #[error("Artifact too large: {size_bytes} bytes (max: {max_bytes})")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Shutdown was requested while the job was running.
    #[error("Job cancelled")]
    Cancelled,

    #[error("Staging I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FetchError> for PipelineError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Fetch(other),
        }
    }
}

impl PipelineError {
    /// Notice to send to the requester, if any.
    pub fn notice(&self, media_kind: MediaKind) -> Option<Notice> {
        match self {
            Self::Fetch(e) => Some(Notice::FetchFailed {
                kind: e.failure_kind(),
            }),
            Self::ArtifactNotFound { .. } | Self::Io(_) => Some(Notice::FetchFailed {
                kind: FetchFailureKind::Unknown,
            }),
            Self::TooLarge {
                size_bytes,
                max_bytes,
            } => Some(Notice::TooLarge {
                size_bytes: *size_bytes,
                max_bytes: *max_bytes,
            }),
            Self::Delivery(_) => Some(Notice::DeliveryFailed { media_kind }),
            Self::Cancelled => None,
        }
    }

    /// Short machine-readable reason, used in job state and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Fetch(FetchError::Timeout { .. }) => "fetch_timeout",
            Self::Fetch(_) => "fetch",
            Self::ArtifactNotFound { .. } => "artifact_not_found",
            Self::TooLarge { .. } => "too_large",
            Self::Delivery(_) => "delivery",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io",
        }
    }
}
