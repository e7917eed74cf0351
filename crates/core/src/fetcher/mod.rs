//! Media fetching through an external tool.
//!
//! This module provides:
//! - Platform detection and per-platform network options
//! - Quality/kind to format argument mapping
//! - Title sanitisation for artifact names
//! - The [`FetchTool`] trait and its yt-dlp implementation

mod config;
mod error;
mod format;
mod platform;
mod title;
mod traits;
mod ytdlp;

pub use config::{CookiesConfig, FetcherConfig};
pub use error::{FetchError, FetchFailureKind};
pub use format::FormatSpec;
pub use platform::{Platform, SiteOptions};
pub use title::{fallback_title, is_fallback_title, sanitize_title};
pub use traits::{FetchOutput, FetchRequest, FetchTool, TitleQuery};
pub use ytdlp::YtDlp;
