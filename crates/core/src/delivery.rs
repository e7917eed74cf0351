//! Delivery collaborator: hands artifacts and notices to the requester.

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::fetcher::FetchFailureKind;
use crate::job::{MediaKind, RequesterId};

/// Opaque failure reported by a transport.
#[derive(Debug, Clone, Error)]
#[error("Delivery failed: {0}")]
pub struct DeliveryError(pub String);

impl DeliveryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Categorized, requester-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// Host is overheating.
    Throttled,
    /// Not enough free memory to start the job.
    LowMemory,
    FetchFailed { kind: FetchFailureKind },
    TooLarge { size_bytes: u64, max_bytes: u64 },
    DeliveryFailed { media_kind: MediaKind },
}

const MB: u64 = 1024 * 1024;

impl Notice {
    /// Plain-text rendering for transports without their own templates.
    pub fn message(&self) -> String {
        match self {
            Notice::Throttled => {
                "The system is overloaded (high temperature). Please try again later.".to_string()
            }
            Notice::LowMemory => {
                "Not enough free memory on the device. Please try again later.".to_string()
            }
            Notice::FetchFailed { kind } => {
                let detail = match kind {
                    FetchFailureKind::BadLink => "The link is not supported or is invalid.",
                    FetchFailureKind::Unavailable => {
                        "The media is unavailable (private, removed, or region locked)."
                    }
                    FetchFailureKind::Network => "A network problem interrupted the download.",
                    FetchFailureKind::Memory => "The device ran out of space or memory.",
                    FetchFailureKind::Unknown => {
                        "Possible causes: invalid link, unavailable media, network problems, or not enough memory."
                    }
                };
                format!(
                    "Download failed.\n\n{}\n\nTry another link or retry later.",
                    detail
                )
            }
            Notice::TooLarge {
                size_bytes,
                max_bytes,
            } => format!(
                "The file is too large to send ({} MB, limit {} MB).",
                size_bytes.div_ceil(MB),
                max_bytes / MB
            ),
            Notice::DeliveryFailed { media_kind } => format!(
                "Failed to send the {}.\n\nThe file may be too large or damaged. Try another link.",
                media_kind
            ),
        }
    }
}

/// Sends artifacts and notices to requesters.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Send an artifact. The file is owned by the caller and removed afterwards.
    async fn deliver(
        &self,
        requester: RequesterId,
        artifact: &Path,
        media_kind: MediaKind,
    ) -> Result<(), DeliveryError>;

    async fn notify(&self, requester: RequesterId, notice: &Notice) -> Result<(), DeliveryError>;
}
