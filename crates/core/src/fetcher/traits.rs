//! Fetch tool trait and request types.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::error::FetchError;
use super::format::FormatSpec;
use super::platform::SiteOptions;
use crate::job::JobId;

/// One download invocation.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub job_id: JobId,
    pub url: String,
    pub site: SiteOptions,
    pub format: FormatSpec,
    /// Staged private copy of the cookie file, never the configured original.
    pub cookies: Option<PathBuf>,
    /// Output path with a `%(ext)s` placeholder.
    pub output_template: PathBuf,
}

/// A title lookup ahead of (or after) a download.
#[derive(Debug, Clone)]
pub struct TitleQuery {
    pub url: String,
    pub site: SiteOptions,
    pub cookies: Option<PathBuf>,
}

/// Result of a successful download.
#[derive(Debug, Clone)]
pub struct FetchOutput {
    /// Combined stdout and stderr of the tool.
    pub output: String,
    pub elapsed: Duration,
}

/// An external media fetch tool.
///
/// Implementations must stop the underlying process when `cancel` fires or when
/// the returned future is dropped.
#[async_trait]
pub trait FetchTool: Send + Sync {
    /// Name of the tool, for logs.
    fn name(&self) -> &str;

    /// Print the media title without downloading. Returns the raw title.
    async fn query_title(
        &self,
        query: &TitleQuery,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError>;

    /// Download the media to `request.output_template`.
    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchOutput, FetchError>;

    /// Check that the tool is installed and usable.
    async fn validate(&self) -> Result<(), FetchError>;
}
