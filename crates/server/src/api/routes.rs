use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, jobs, middleware::metrics_middleware, pending, preferences};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Jobs
        .route("/jobs", post(jobs::create_job))
        .route("/queue/status", get(jobs::queue_status))
        .route("/pool/status", get(jobs::pool_status))
        // Pending requests
        .route("/pending", post(pending::create_pending))
        .route("/pending/{reference}/confirm", post(pending::confirm_pending))
        // Preferences
        .route("/preferences/{requester_id}", get(preferences::get_preferences))
        .route("/preferences/{requester_id}/quality", put(preferences::set_quality))
        .route("/preferences/{requester_id}/media-type", put(preferences::set_media_type))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
