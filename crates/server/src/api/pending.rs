//! Pending request handlers: park a URL, then confirm it into a job.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use grabber_core::{PendingRequest, RequesterId};

use super::handlers::{api_error, ApiError};
use super::jobs::{admission_permit, submit_job, validate_url, JobOverrides, JobResponse};
use crate::state::AppState;

/// Request body for parking a URL
#[derive(Debug, Deserialize)]
pub struct CreatePendingBody {
    pub url: String,
}

/// Request body for confirming a parked URL
#[derive(Debug, Deserialize)]
pub struct ConfirmPendingBody {
    pub requester_id: RequesterId,
    pub quality: Option<String>,
    pub media_type: Option<String>,
}

/// Park a URL and return its reference
pub async fn create_pending(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePendingBody>,
) -> Result<(StatusCode, Json<PendingRequest>), ApiError> {
    validate_url(&body.url)?;

    let pending = state.pending().put(body.url.trim()).map_err(|e| {
        error!(error = %e, "Failed to store pending request");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(pending)))
}

/// Consume a reference and submit the job it stands for.
///
/// A reference can be confirmed once. Expired or used references return 404.
/// The reference is only consumed once an admission permit is held, and is put
/// back if the job cannot be submitted.
pub async fn confirm_pending(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
    Json(body): Json<ConfirmPendingBody>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    let overrides = JobOverrides::parse(body.quality.as_deref(), body.media_type.as_deref())?;
    let permit = admission_permit(&state).await?;

    let url = state
        .pending()
        .take(&reference)
        .map_err(|e| {
            error!(reference = %reference, error = %e, "Failed to read pending request");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                "Request expired or already used. Please send the link again.",
            )
        })?;

    let job = submit_job(&state, &permit, &url, body.requester_id, overrides).inspect_err(
        |_| {
            if let Err(e) = state.pending().restore(&reference, &url) {
                warn!(reference = %reference, error = %e, "Failed to restore pending request");
            }
        },
    )?;
    info!(
        job_id = %job.id,
        requester = job.requester_id,
        reference = %reference,
        "Pending request confirmed"
    );

    Ok((StatusCode::CREATED, Json(JobResponse::from(&job))))
}
