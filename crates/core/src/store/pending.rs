//! Short-lived staging of URLs awaiting a quality/kind choice.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::kv::{SqliteKvStore, StoreError};

const KEY_PREFIX: &str = "pending_url:";

/// Default lifetime of a pending request.
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(600);

/// A URL parked until the requester confirms it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRequest {
    pub reference: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Read-once store of pending requests.
pub struct PendingRequestStore {
    kv: Arc<SqliteKvStore>,
    ttl: Duration,
}

impl PendingRequestStore {
    pub fn new(kv: Arc<SqliteKvStore>) -> Self {
        Self {
            kv,
            ttl: DEFAULT_PENDING_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Park a URL under a fresh reference.
    pub fn put(&self, url: &str) -> Result<PendingRequest, StoreError> {
        let reference = uuid::Uuid::new_v4().simple().to_string();
        self.kv.set(&key(&reference), url, self.ttl)?;

        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::zero());
        debug!(reference = %reference, "Stored pending request");

        Ok(PendingRequest {
            reference,
            url: url.to_string(),
            expires_at,
        })
    }

    /// Fetch and delete the URL for `reference`. `None` once taken or expired.
    pub fn take(&self, reference: &str) -> Result<Option<String>, StoreError> {
        self.kv.take(&key(reference))
    }

    /// Put a taken URL back under its reference, with a fresh lifetime.
    pub fn restore(&self, reference: &str, url: &str) -> Result<(), StoreError> {
        self.kv.set(&key(reference), url, self.ttl)?;
        debug!(reference = %reference, "Restored pending request");
        Ok(())
    }
}

fn key(reference: &str) -> String {
    format!("{}{}", KEY_PREFIX, reference)
}
