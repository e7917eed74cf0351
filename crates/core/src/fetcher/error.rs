//! Error types for the fetcher module.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving the fetch tool.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The tool binary could not be spawned.
    #[error("Fetch tool not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// The tool exited unsuccessfully.
    #[error("Fetch tool exited with status {code:?}")]
    Failed { code: Option<i32>, output: String },

    #[error("Fetch timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The title query succeeded but printed nothing usable.
    #[error("Fetch tool returned an empty title")]
    EmptyTitle,

    #[error("Fetch cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn failed(code: Option<i32>, output: impl Into<String>) -> Self {
        Self::Failed {
            code,
            output: output.into(),
        }
    }

    /// Captured tool output, when there is any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Failed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Requester-facing category of this failure.
    pub fn failure_kind(&self) -> FetchFailureKind {
        match self {
            Self::Failed { output, .. } => FetchFailureKind::classify_output(output),
            Self::Timeout { .. } => FetchFailureKind::Network,
            _ => FetchFailureKind::Unknown,
        }
    }
}

/// Coarse category of a failed fetch, derived from the tool's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailureKind {
    BadLink,
    Unavailable,
    Network,
    Memory,
    Unknown,
}

static MEMORY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)no space left on device|cannot allocate memory|out of memory|memoryerror")
        .unwrap()
});

static BAD_LINK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)unsupported url|is not a valid url|invalid url|no suitable extractor").unwrap()
});

static UNAVAILABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)video unavailable|private video|has been removed|is not available|http error 40[34]|login required|sign in to confirm|requested format is not available",
    )
    .unwrap()
});

static NETWORK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)timed out|connection (reset|refused|aborted)|name resolution|network is unreachable|unable to download webpage|ssl|http error 5\d\d",
    )
    .unwrap()
});

impl FetchFailureKind {
    /// Classify captured tool output. First match wins, in the order memory,
    /// bad link, unavailable, network.
    pub fn classify_output(output: &str) -> Self {
        if MEMORY_PATTERN.is_match(output) {
            Self::Memory
        } else if BAD_LINK_PATTERN.is_match(output) {
            Self::BadLink
        } else if UNAVAILABLE_PATTERN.is_match(output) {
            Self::Unavailable
        } else if NETWORK_PATTERN.is_match(output) {
            Self::Network
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadLink => "bad_link",
            Self::Unavailable => "unavailable",
            Self::Network => "network",
            Self::Memory => "memory",
            Self::Unknown => "unknown",
        }
    }
}
