//! Core job data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of the party that requested a job (a chat id for the Telegram transport).
pub type RequesterId = i64;

/// Opaque unique job identifier, assigned once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when parsing an unknown enum value from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseValueError {
    kind: &'static str,
    value: String,
}

/// Queue lane a job is placed in. Serialized as `0` (low) or `1` (high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Priority {
    #[default]
    Low,
    High,
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => 0,
            Priority::High => 1,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = ParseValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Priority::Low),
            1 => Ok(Priority::High),
            other => Err(ParseValueError {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// Requested output quality.
///
/// Serialized as the lowercase label (`"best"`, `"1080p"`, ..., `"audio"`).
/// Unknown or empty labels read back as [`Quality::Best`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Quality {
    #[default]
    Best,
    P1080,
    P720,
    P480,
    P360,
    Audio,
}

impl Quality {
    pub const ALL: [Quality; 6] = [
        Quality::Best,
        Quality::P1080,
        Quality::P720,
        Quality::P480,
        Quality::P360,
        Quality::Audio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Best => "best",
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::P360 => "360p",
            Quality::Audio => "audio",
        }
    }

    /// Maximum video height for the height-capped qualities.
    pub fn max_height(&self) -> Option<u32> {
        match self {
            Quality::P1080 => Some(1080),
            Quality::P720 => Some(720),
            Quality::P480 => Some(480),
            Quality::P360 => Some(360),
            Quality::Best | Quality::Audio => None,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quality::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseValueError {
                kind: "quality",
                value: s.to_string(),
            })
    }
}

impl From<Quality> for String {
    fn from(quality: Quality) -> Self {
        quality.as_str().to_string()
    }
}

impl From<String> for Quality {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

/// Kind of media to fetch.
///
/// Serialized as `"video"` or `"audio"`; unknown or empty values read back as video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MediaKind {
    #[default]
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            _ => Err(ParseValueError {
                kind: "media kind",
                value: s.to_string(),
            }),
        }
    }
}

impl From<MediaKind> for String {
    fn from(kind: MediaKind) -> Self {
        kind.as_str().to_string()
    }
}

impl From<String> for MediaKind {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

/// One fetch request.
///
/// The serialized form is the durable queue record:
/// `{id, url, chat_id, priority, quality, media_type, created_at}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    #[serde(rename = "chat_id")]
    pub requester_id: RequesterId,
    pub priority: Priority,
    #[serde(default)]
    pub quality: Quality,
    #[serde(rename = "media_type", default)]
    pub media_kind: MediaKind,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a job with a fresh id and the current time.
    pub fn new(
        url: impl Into<String>,
        requester_id: RequesterId,
        priority: Priority,
        quality: Quality,
        media_kind: MediaKind,
    ) -> Self {
        Self {
            id: JobId::new(),
            url: url.into(),
            requester_id,
            priority,
            quality,
            media_kind,
            created_at: Utc::now(),
        }
    }
}
