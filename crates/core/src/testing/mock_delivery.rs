//! Mock delivery transport for testing.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::delivery::{DeliveryError, DeliveryTransport, Notice};
use crate::job::{MediaKind, RequesterId};

/// A recorded delivery for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDelivery {
    pub requester: RequesterId,
    pub file_name: String,
    pub media_kind: MediaKind,
    /// Size of the artifact when it was handed over.
    pub size_bytes: u64,
}

/// Mock implementation of the DeliveryTransport trait.
///
/// Records deliveries and notices; the next delivery can be made to fail.
#[derive(Debug, Default)]
pub struct MockDelivery {
    deliveries: Arc<RwLock<Vec<RecordedDelivery>>>,
    notices: Arc<RwLock<Vec<(RequesterId, Notice)>>>,
    next_error: Arc<RwLock<Option<DeliveryError>>>,
}

impl MockDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded_deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.read().await.clone()
    }

    pub async fn delivery_count(&self) -> usize {
        self.deliveries.read().await.len()
    }

    pub async fn recorded_notices(&self) -> Vec<(RequesterId, Notice)> {
        self.notices.read().await.clone()
    }

    /// Notices sent to one requester, in order.
    pub async fn notices_for(&self, requester: RequesterId) -> Vec<Notice> {
        self.notices
            .read()
            .await
            .iter()
            .filter(|(r, _)| *r == requester)
            .map(|(_, n)| n.clone())
            .collect()
    }

    /// Configure the next delivery to fail with the given error.
    pub async fn set_next_error(&self, error: DeliveryError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl DeliveryTransport for MockDelivery {
    async fn deliver(
        &self,
        requester: RequesterId,
        artifact: &Path,
        media_kind: MediaKind,
    ) -> Result<(), DeliveryError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let size_bytes = tokio::fs::metadata(artifact)
            .await
            .map_err(|e| DeliveryError::new(e.to_string()))?
            .len();

        self.deliveries.write().await.push(RecordedDelivery {
            requester,
            file_name: artifact
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            media_kind,
            size_bytes,
        });
        Ok(())
    }

    async fn notify(&self, requester: RequesterId, notice: &Notice) -> Result<(), DeliveryError> {
        self.notices.write().await.push((requester, notice.clone()));
        Ok(())
    }
}
