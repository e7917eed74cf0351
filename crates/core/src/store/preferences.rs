//! Per-requester default quality and media kind.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::kv::{SqliteKvStore, StoreError};
use crate::job::{MediaKind, Quality, RequesterId};

const KEY_PREFIX: &str = "prefs:";

/// Default lifetime of a preference, refreshed on every write.
pub const DEFAULT_PREFERENCE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Stored defaults for one requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preference {
    #[serde(default)]
    pub quality: Quality,
    #[serde(rename = "media_type", default)]
    pub media_kind: MediaKind,
}

impl Preference {
    /// Apply a quality choice. Audio quality implies audio kind, any other quality
    /// implies video.
    pub fn with_quality(self, quality: Quality) -> Self {
        let media_kind = if quality == Quality::Audio {
            MediaKind::Audio
        } else {
            MediaKind::Video
        };
        Self {
            quality,
            media_kind,
        }
    }

    /// Apply a kind choice. Audio kind implies audio quality; switching back to
    /// video drops a leftover audio quality to best.
    pub fn with_media_kind(self, media_kind: MediaKind) -> Self {
        let quality = match (media_kind, self.quality) {
            (MediaKind::Audio, _) => Quality::Audio,
            (MediaKind::Video, Quality::Audio) => Quality::Best,
            (MediaKind::Video, quality) => quality,
        };
        Self {
            quality,
            media_kind,
        }
    }
}

/// Durable preference store with last-write-wins semantics.
pub struct PreferenceStore {
    kv: Arc<SqliteKvStore>,
    ttl: Duration,
}

impl PreferenceStore {
    pub fn new(kv: Arc<SqliteKvStore>) -> Self {
        Self {
            kv,
            ttl: DEFAULT_PREFERENCE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Current preference. Missing, expired, or unreadable entries read as the default.
    pub fn get(&self, requester: RequesterId) -> Result<Preference, StoreError> {
        let Some(raw) = self.kv.get(&key(requester))? else {
            return Ok(Preference::default());
        };
        match serde_json::from_str(&raw) {
            Ok(pref) => Ok(pref),
            Err(e) => {
                warn!(requester, error = %e, "Unreadable preference, using default");
                Ok(Preference::default())
            }
        }
    }

    pub fn save(&self, requester: RequesterId, pref: Preference) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string(&pref).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.kv.set(&key(requester), &raw, self.ttl)
    }

    pub fn set_quality(
        &self,
        requester: RequesterId,
        quality: Quality,
    ) -> Result<Preference, StoreError> {
        let pref = self.get(requester)?.with_quality(quality);
        self.save(requester, pref)?;
        Ok(pref)
    }

    pub fn set_media_kind(
        &self,
        requester: RequesterId,
        media_kind: MediaKind,
    ) -> Result<Preference, StoreError> {
        let pref = self.get(requester)?.with_media_kind(media_kind);
        self.save(requester, pref)?;
        Ok(pref)
    }
}

fn key(requester: RequesterId) -> String {
    format!("{}{}", KEY_PREFIX, requester)
}
