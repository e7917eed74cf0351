//! Job submission and status handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{error, info};

use grabber_core::{
    Job, JobId, Lane, MediaKind, PoolStatus, Preference, Priority, Quality, RequesterId,
};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a job
#[derive(Debug, Deserialize)]
pub struct SubmitJobBody {
    pub url: String,
    pub requester_id: RequesterId,
    /// Overrides the requester's stored quality for this job only
    pub quality: Option<String>,
    /// Overrides the requester's stored media type for this job only
    pub media_type: Option<String>,
}

/// Response for an accepted job
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: JobId,
    pub url: String,
    pub requester_id: RequesterId,
    pub priority: Priority,
    pub quality: Quality,
    pub media_type: MediaKind,
    pub created_at: String,
}

impl From<&Job> for JobResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            url: job.url.clone(),
            requester_id: job.requester_id,
            priority: job.priority,
            quality: job.quality,
            media_type: job.media_kind,
            created_at: job.created_at.to_rfc3339(),
        }
    }
}

/// Response for queue status
#[derive(Debug, Serialize)]
pub struct QueueStatusResponse {
    pub depth: usize,
    pub high: usize,
    pub low: usize,
}

// ============================================================================
// Shared submission path
// ============================================================================

/// Per-job overrides parsed from a request body.
#[derive(Debug, Default, Clone, Copy)]
pub struct JobOverrides {
    pub quality: Option<Quality>,
    pub media_kind: Option<MediaKind>,
}

impl JobOverrides {
    pub fn parse(quality: Option<&str>, media_type: Option<&str>) -> Result<Self, ApiError> {
        let quality = quality
            .map(str::parse::<Quality>)
            .transpose()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        let media_kind = media_type
            .map(str::parse::<MediaKind>)
            .transpose()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        Ok(Self {
            quality,
            media_kind,
        })
    }

    fn apply(self, mut pref: Preference) -> Preference {
        if let Some(quality) = self.quality {
            pref = pref.with_quality(quality);
        }
        if let Some(media_kind) = self.media_kind {
            pref = pref.with_media_kind(media_kind);
        }
        pref
    }
}

pub fn validate_url(url: &str) -> Result<(), ApiError> {
    match reqwest::Url::parse(url.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Not a valid http(s) URL: {}", url),
        )),
    }
}

/// Admission permit shared with the worker pool. Held while a job is built and
/// enqueued.
pub async fn admission_permit(state: &AppState) -> Result<OwnedSemaphorePermit, ApiError> {
    state
        .pool()
        .admission()
        .acquire_owned()
        .await
        .map_err(|_| api_error(StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down"))
}

/// Build a job from the requester's preferences and enqueue it. The caller
/// holds an admission permit for the duration.
pub fn submit_job(
    state: &AppState,
    _permit: &OwnedSemaphorePermit,
    url: &str,
    requester: RequesterId,
    overrides: JobOverrides,
) -> Result<Job, ApiError> {
    let stored = state.preferences().get(requester).map_err(|e| {
        error!(requester, error = %e, "Failed to read preferences");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let pref = overrides.apply(stored);
    let priority = state.config().server.priority_for(requester);

    let job = Job::new(url.trim(), requester, priority, pref.quality, pref.media_kind);
    state.pool().submit(&job).map_err(|e| {
        error!(job_id = %job.id, error = %e, "Failed to submit job");
        api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;

    Ok(job)
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a new job
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitJobBody>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    validate_url(&body.url)?;
    let overrides = JobOverrides::parse(body.quality.as_deref(), body.media_type.as_deref())?;

    let permit = admission_permit(&state).await?;
    let job = submit_job(&state, &permit, &body.url, body.requester_id, overrides)?;
    info!(job_id = %job.id, requester = job.requester_id, "Job accepted via API");

    Ok((StatusCode::CREATED, Json(JobResponse::from(&job))))
}

/// Pending jobs per lane
pub async fn queue_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<QueueStatusResponse>, ApiError> {
    let queue = state.queue();
    let lane_len = |lane: Lane| {
        queue
            .lane_len(lane)
            .map_err(|e| api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
    };
    let high = lane_len(Lane::High)?;
    let low = lane_len(Lane::Low)?;

    Ok(Json(QueueStatusResponse {
        depth: high + low,
        high,
        low,
    }))
}

/// Worker pool status
pub async fn pool_status(State(state): State<Arc<AppState>>) -> Json<PoolStatus> {
    Json(state.pool().status())
}
