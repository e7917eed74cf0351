//! Requester preference handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use grabber_core::{MediaKind, Preference, Quality, RequesterId, StoreError};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetQualityBody {
    pub quality: String,
}

#[derive(Debug, Deserialize)]
pub struct SetMediaTypeBody {
    pub media_type: String,
}

fn store_error(requester: RequesterId, e: StoreError) -> ApiError {
    error!(requester, error = %e, "Preference store error");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Path(requester): Path<RequesterId>,
) -> Result<Json<Preference>, ApiError> {
    state
        .preferences()
        .get(requester)
        .map(Json)
        .map_err(|e| store_error(requester, e))
}

/// Set the default quality. Choosing `audio` also switches the media type.
pub async fn set_quality(
    State(state): State<Arc<AppState>>,
    Path(requester): Path<RequesterId>,
    Json(body): Json<SetQualityBody>,
) -> Result<Json<Preference>, ApiError> {
    let quality: Quality = body
        .quality
        .parse()
        .map_err(|e: grabber_core::job::ParseValueError| {
            api_error(StatusCode::BAD_REQUEST, e.to_string())
        })?;

    state
        .preferences()
        .set_quality(requester, quality)
        .map(Json)
        .map_err(|e| store_error(requester, e))
}

/// Set the default media type.
pub async fn set_media_type(
    State(state): State<Arc<AppState>>,
    Path(requester): Path<RequesterId>,
    Json(body): Json<SetMediaTypeBody>,
) -> Result<Json<Preference>, ApiError> {
    let media_kind: MediaKind = body
        .media_type
        .parse()
        .map_err(|e: grabber_core::job::ParseValueError| {
            api_error(StatusCode::BAD_REQUEST, e.to_string())
        })?;

    state
        .preferences()
        .set_media_kind(requester, media_kind)
        .map(Json)
        .map_err(|e| store_error(requester, e))
}
