//! Mock fetch tool for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::fetcher::{FetchError, FetchOutput, FetchRequest, FetchTool, FormatSpec, TitleQuery};

/// A fetch request as seen by the mock, with the staged cookies it could read.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    pub request: FetchRequest,
    /// Contents of the staged cookie file at fetch time, if one was passed.
    pub cookies_contents: Option<String>,
}

/// Mock implementation of the FetchTool trait.
///
/// Provides controllable behavior for testing:
/// - Writes a fake artifact at the request's output template
/// - Configurable title, failure, and delay
/// - Records every request for assertions
///
/// # Example
///
/// ```rust,ignore
/// use grabber_core::testing::MockFetchTool;
///
/// let fetcher = MockFetchTool::new();
/// fetcher.set_title(Some("My Song")).await;
///
/// // Run a pipeline with it...
///
/// let fetches = fetcher.recorded_fetches().await;
/// assert_eq!(fetches.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockFetchTool {
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    title_queries: Arc<RwLock<Vec<TitleQuery>>>,
    /// Title returned by queries; `None` makes them fail.
    title: Arc<RwLock<Option<String>>>,
    /// Number of upcoming title queries that fail regardless of `title`.
    failing_title_queries: Arc<RwLock<usize>>,
    /// If set, the next fetch will fail with this error.
    next_error: Arc<RwLock<Option<FetchError>>>,
    /// Size of the artifact written on success.
    artifact_size: Arc<RwLock<usize>>,
    /// Whether a successful fetch writes an artifact at all.
    write_artifact: Arc<RwLock<bool>>,
    /// Simulated fetch duration.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetchTool {
    pub fn new() -> Self {
        Self {
            fetches: Arc::new(RwLock::new(Vec::new())),
            title_queries: Arc::new(RwLock::new(Vec::new())),
            title: Arc::new(RwLock::new(Some("Mock Title".to_string()))),
            failing_title_queries: Arc::new(RwLock::new(0)),
            next_error: Arc::new(RwLock::new(None)),
            artifact_size: Arc::new(RwLock::new(1024)),
            write_artifact: Arc::new(RwLock::new(true)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    pub async fn title_query_count(&self) -> usize {
        self.title_queries.read().await.len()
    }

    pub async fn set_title(&self, title: Option<&str>) {
        *self.title.write().await = title.map(str::to_string);
    }

    /// Make the next `count` title queries fail.
    pub async fn fail_title_queries(&self, count: usize) {
        *self.failing_title_queries.write().await = count;
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_artifact_size(&self, bytes: usize) {
        *self.artifact_size.write().await = bytes;
    }

    pub async fn set_write_artifact(&self, write: bool) {
        *self.write_artifact.write().await = write;
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    async fn take_error(&self) -> Option<FetchError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl FetchTool for MockFetchTool {
    fn name(&self) -> &str {
        "mock"
    }

    async fn query_title(
        &self,
        query: &TitleQuery,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        self.title_queries.write().await.push(query.clone());

        {
            let mut failing = self.failing_title_queries.write().await;
            if *failing > 0 {
                *failing -= 1;
                return Err(FetchError::failed(Some(1), "ERROR: Unable to extract title"));
            }
        }

        match self.title.read().await.clone() {
            Some(title) => Ok(title),
            None => Err(FetchError::failed(
                Some(1),
                "ERROR: Unable to extract title",
            )),
        }
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchOutput, FetchError> {
        let cookies_contents = match &request.cookies {
            Some(path) => tokio::fs::read_to_string(path).await.ok(),
            None => None,
        };
        self.fetches.write().await.push(RecordedFetch {
            request: request.clone(),
            cookies_contents,
        });

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        if *self.write_artifact.read().await {
            let ext = match request.format {
                FormatSpec::ExtractAudio => "mp3",
                FormatSpec::Video { .. } => "mp4",
            };
            let template = request.output_template.to_string_lossy();
            let path = template.replace("%(ext)s", ext);
            let size = *self.artifact_size.read().await;
            tokio::fs::write(&path, vec![0u8; size]).await?;
        }

        Ok(FetchOutput {
            output: "[download] 100% of 1.00KiB".to_string(),
            elapsed: delay,
        })
    }

    async fn validate(&self) -> Result<(), FetchError> {
        Ok(())
    }
}
