//! Fetch, resolve, check, deliver.

use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::artifact;
use super::error::PipelineError;
use super::staging::StagingScope;
use crate::delivery::DeliveryTransport;
use crate::fetcher::{
    fallback_title, is_fallback_title, sanitize_title, FetchError, FetchRequest, FetchTool,
    FetcherConfig, FormatSpec, Platform, SiteOptions, TitleQuery,
};
use crate::job::{Job, JobState, JobTracker, MediaKind};
use crate::metrics;

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivered {
    pub file_name: String,
    pub size_bytes: u64,
    pub media_kind: MediaKind,
}

/// Turns one admitted job into a delivered artifact.
pub struct ExecutionPipeline {
    fetcher: Arc<dyn FetchTool>,
    transport: Arc<dyn DeliveryTransport>,
    config: FetcherConfig,
}

impl ExecutionPipeline {
    pub fn new(
        fetcher: Arc<dyn FetchTool>,
        transport: Arc<dyn DeliveryTransport>,
        config: FetcherConfig,
    ) -> Self {
        Self {
            fetcher,
            transport,
            config,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Run the job to completion. Staged files are removed however this returns,
    /// and also if the future is dropped.
    pub async fn run(
        &self,
        job: &Job,
        tracker: &JobTracker,
        cancel: &CancellationToken,
    ) -> Result<Delivered, PipelineError> {
        tokio::fs::create_dir_all(&self.config.staging_dir).await?;
        let mut scope = StagingScope::new(&self.config.staging_dir, &job.id);
        tracker.transition(&job.id, JobState::Fetching);

        let platform = Platform::detect(&job.url);
        let site = SiteOptions::for_platform(platform);
        let format = FormatSpec::resolve(job.quality, job.media_kind);
        let cookies = self.stage_credentials(&mut scope, job, platform);

        let title_query = TitleQuery {
            url: job.url.clone(),
            site: site.clone(),
            cookies: cookies.clone(),
        };

        let stem = match job.media_kind {
            MediaKind::Audio => match self.resolve_title(&title_query, cancel).await? {
                Some(title) => title,
                None => fallback_title(Utc::now()),
            },
            MediaKind::Video => job.id.to_string(),
        };

        let request = FetchRequest {
            job_id: job.id.clone(),
            url: job.url.clone(),
            site,
            format,
            cookies,
            output_template: scope.dir().join(format!("{}.%(ext)s", stem)),
        };

        info!(
            job_id = %job.id,
            platform = platform.as_str(),
            quality = %job.quality,
            media_kind = %job.media_kind,
            tool = self.fetcher.name(),
            "Starting fetch"
        );

        let started = std::time::Instant::now();
        let fetch_started = std::time::SystemTime::now();
        let fetched = self.fetcher.fetch(&request, cancel).await;
        let result_label = if fetched.is_ok() { "success" } else { "failure" };
        metrics::FETCH_DURATION
            .with_label_values(&[platform.as_str(), result_label])
            .observe(started.elapsed().as_secs_f64());

        match fetched {
            Ok(output) => debug!(job_id = %job.id, elapsed = ?output.elapsed, "Fetch finished"),
            Err(e) => {
                if let Some(output) = e.output() {
                    warn!(job_id = %job.id, error = %e, output = %output, "Fetch failed");
                } else {
                    warn!(job_id = %job.id, error = %e, "Fetch failed");
                }
                return Err(e.into());
            }
        }

        let path = match job.media_kind {
            MediaKind::Video => artifact::find_by_prefix(scope.dir(), &stem).await?,
            MediaKind::Audio => artifact::find_audio(scope.dir(), &stem, fetch_started).await?,
        }
        .ok_or_else(|| PipelineError::ArtifactNotFound {
            dir: scope.dir().to_path_buf(),
        })?;
        scope.set_artifact(path.clone());

        let path = if job.media_kind == MediaKind::Audio {
            self.retitle_fallback(&mut scope, path, &title_query, cancel)
                .await?
        } else {
            path
        };
        tracker.transition(&job.id, JobState::Resolved);

        let size_bytes = tokio::fs::metadata(&path).await?.len();
        let max_bytes = self.config.max_file_size_bytes();
        if size_bytes > max_bytes {
            warn!(job_id = %job.id, size_bytes, max_bytes, "Artifact exceeds size limit");
            return Err(PipelineError::TooLarge {
                size_bytes,
                max_bytes,
            });
        }
        metrics::ARTIFACT_BYTES
            .with_label_values(&[job.media_kind.as_str()])
            .observe(size_bytes as f64);

        tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            delivered = self.transport.deliver(job.requester_id, &path, job.media_kind) => delivered?,
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(job_id = %job.id, file = %file_name, size_bytes, "Artifact delivered");

        Ok(Delivered {
            file_name,
            size_bytes,
            media_kind: job.media_kind,
        })
    }

    /// Stage the platform's cookie file, if any. A failed copy runs without cookies.
    fn stage_credentials(
        &self,
        scope: &mut StagingScope,
        job: &Job,
        platform: Platform,
    ) -> Option<PathBuf> {
        let Some(source) = self.config.cookies.for_platform(platform) else {
            if platform == Platform::TikTok {
                warn!(job_id = %job.id, "No cookies configured for TikTok, requests may be blocked");
            }
            return None;
        };

        match scope.stage_credentials(&source) {
            Ok(staged) => Some(staged),
            Err(e) => {
                warn!(
                    job_id = %job.id,
                    source = %source.display(),
                    error = %e,
                    "Failed to stage cookies, continuing without them"
                );
                None
            }
        }
    }

    /// Query and sanitize the title. Only cancellation is an error.
    async fn resolve_title(
        &self,
        query: &TitleQuery,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, PipelineError> {
        match self.fetcher.query_title(query, cancel).await {
            Ok(raw) => {
                let title = sanitize_title(&raw);
                Ok((!title.is_empty() && !is_fallback_title(&title)).then_some(title))
            }
            Err(FetchError::Cancelled) => Err(PipelineError::Cancelled),
            Err(e) => {
                debug!(url = %query.url, error = %e, "Title query failed");
                Ok(None)
            }
        }
    }

    /// Give an audio artifact that still carries a fallback name its real title,
    /// if the title can now be obtained.
    async fn retitle_fallback(
        &self,
        scope: &mut StagingScope,
        path: PathBuf,
        query: &TitleQuery,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, PipelineError> {
        let is_fallback = path
            .file_stem()
            .map(|s| is_fallback_title(&s.to_string_lossy()))
            .unwrap_or(false);
        if !is_fallback {
            return Ok(path);
        }

        let Some(title) = self.resolve_title(query, cancel).await? else {
            return Ok(path);
        };
        let renamed = scope.dir().join(format!("{}.mp3", title));
        if tokio::fs::try_exists(&renamed).await.unwrap_or(true) {
            return Ok(path);
        }

        match tokio::fs::rename(&path, &renamed).await {
            Ok(()) => {
                scope.set_artifact(renamed.clone());
                Ok(renamed)
            }
            Err(e) => {
                warn!(error = %e, "Failed to rename audio artifact");
                Ok(path)
            }
        }
    }
}
