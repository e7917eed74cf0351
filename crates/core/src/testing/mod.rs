//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external collaborator traits,
//! allowing the worker pool and pipeline to be exercised without yt-dlp, a Bot API
//! server, or real host probes.
//!
//! # Example
//!
//! ```rust,ignore
//! use grabber_core::testing::{MockDelivery, MockFetchTool, StaticMemoryProbe};
//!
//! let fetcher = MockFetchTool::new();
//! let delivery = MockDelivery::new();
//! let memory = StaticMemoryProbe::new(1 << 30);
//!
//! // Configure mock responses
//! fetcher.set_title(None).await;
//! memory.set_free_bytes(0);
//! ```

mod mock_delivery;
mod mock_fetcher;
mod mock_probes;

pub use mock_delivery::{MockDelivery, RecordedDelivery};
pub use mock_fetcher::{MockFetchTool, RecordedFetch};
pub use mock_probes::{StaticMemoryProbe, StaticThermalProbe};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::fetcher::FetcherConfig;
    use crate::job::{Job, MediaKind, Priority, Quality, RequesterId};

    /// A video job at best quality.
    pub fn video_job(url: &str, requester: RequesterId) -> Job {
        Job::new(url, requester, Priority::Low, Quality::Best, MediaKind::Video)
    }

    /// An audio-only job.
    pub fn audio_job(url: &str, requester: RequesterId) -> Job {
        Job::new(url, requester, Priority::Low, Quality::Audio, MediaKind::Audio)
    }

    /// Fetcher configuration staging into `dir`, with no external downloader.
    pub fn fetcher_config(dir: &Path) -> FetcherConfig {
        let mut config = FetcherConfig::default().with_staging_dir(dir);
        config.external_downloader = String::new();
        config
    }
}
