//! HTTP API integration tests.
//!
//! Exercise the router in-process against a real queue and key/value store.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestFixture, PRIORITY_REQUESTER};
use grabber_core::{JobQueue, Lane};

// =============================================================================
// Health, config, metrics
// =============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "status", json!("ok"));
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/config").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["telegram"]["bot_token_configured"], json!(true));
    assert!(response.body["telegram"].get("bot_token").is_none());
    assert!(!response.body.to_string().contains("test-token"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let (status, text) = fixture.get_text("/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("grabber_http_requests_total"));
    assert!(text.contains("grabber_queue_depth"));
}

// =============================================================================
// Job submission
// =============================================================================

#[tokio::test]
async fn test_submit_job_uses_default_preference() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/v1/jobs",
            json!({ "url": "https://www.youtube.com/watch?v=abc", "requester_id": 1 }),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert_json_path!(response.body, "quality", json!("best"));
    assert_json_path!(response.body, "media_type", json!("video"));
    assert_json_path!(response.body, "priority", json!(0));
    assert_json_path!(response.body, "requester_id", json!(1));
    assert!(response.body["job_id"].is_string());

    assert_eq!(fixture.queue.lane_len(Lane::Low).unwrap(), 1);
    assert_eq!(fixture.queue.lane_len(Lane::High).unwrap(), 0);
}

#[tokio::test]
async fn test_priority_requester_goes_to_high_lane() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/v1/jobs",
            json!({ "url": "https://youtu.be/abc", "requester_id": PRIORITY_REQUESTER }),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert_json_path!(response.body, "priority", json!(1));

    let status = fixture.get("/api/v1/queue/status").await;
    assert_status!(status, StatusCode::OK);
    assert_json_path!(status.body, "high", json!(1));
    assert_json_path!(status.body, "low", json!(0));
    assert_json_path!(status.body, "depth", json!(1));
}

#[tokio::test]
async fn test_submit_job_uses_stored_preference() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .put("/api/v1/preferences/7/quality", json!({ "quality": "720p" }))
        .await;
    assert_status!(response, StatusCode::OK);

    let response = fixture
        .post(
            "/api/v1/jobs",
            json!({ "url": "https://vimeo.com/1", "requester_id": 7 }),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert_json_path!(response.body, "quality", json!("720p"));
    assert_json_path!(response.body, "media_type", json!("video"));
}

#[tokio::test]
async fn test_submit_job_overrides_do_not_persist() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/v1/jobs",
            json!({
                "url": "https://soundcloud.com/a/b",
                "requester_id": 8,
                "media_type": "audio"
            }),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert_json_path!(response.body, "quality", json!("audio"));
    assert_json_path!(response.body, "media_type", json!("audio"));

    let prefs = fixture.get("/api/v1/preferences/8").await;
    assert_json_path!(prefs.body, "media_type", json!("video"));
}

#[tokio::test]
async fn test_submit_job_rejects_bad_input() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/jobs", json!({ "url": "not a url", "requester_id": 1 }))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());

    let response = fixture
        .post(
            "/api/v1/jobs",
            json!({ "url": "https://youtu.be/a", "requester_id": 1, "quality": "8k" }),
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let response = fixture.post_raw("/api/v1/jobs", "{not json").await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let response = fixture
        .post("/api/v1/jobs", json!({ "url": "https://youtu.be/a" }))
        .await;
    assert_status!(response, StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(fixture.queue.status().unwrap(), 0);
}

// =============================================================================
// Pending requests
// =============================================================================

#[tokio::test]
async fn test_pending_request_confirmed_once() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/pending", json!({ "url": "https://www.tiktok.com/@u/video/1" }))
        .await;
    assert_status!(response, StatusCode::CREATED);
    let reference = response.body["reference"]
        .as_str()
        .expect("reference should be a string")
        .to_string();
    assert_json_path!(response.body, "url", json!("https://www.tiktok.com/@u/video/1"));

    let path = format!("/api/v1/pending/{}/confirm", reference);
    let response = fixture
        .post(&path, json!({ "requester_id": 3, "quality": "480p" }))
        .await;
    assert_status!(response, StatusCode::CREATED);
    assert_json_path!(response.body, "url", json!("https://www.tiktok.com/@u/video/1"));
    assert_json_path!(response.body, "quality", json!("480p"));
    assert_eq!(fixture.queue.status().unwrap(), 1);

    // Read-once
    let response = fixture.post(&path, json!({ "requester_id": 3 })).await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(fixture.queue.status().unwrap(), 1);
}

#[tokio::test]
async fn test_pending_reference_kept_while_waiting_for_admission() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/v1/pending", json!({ "url": "https://youtu.be/held" }))
        .await;
    let reference = response.body["reference"]
        .as_str()
        .expect("reference should be a string")
        .to_string();
    let path = format!("/api/v1/pending/{}/confirm", reference);

    let admission = fixture.pool.admission();
    let held = admission.clone()
        .acquire_many_owned(admission.available_permits() as u32)
        .await
        .expect("Failed to hold admission permits");

    // The client gives up while every permit is taken
    let gave_up = tokio::time::timeout(
        Duration::from_millis(200),
        fixture.post(&path, json!({ "requester_id": 3 })),
    )
    .await;
    assert!(gave_up.is_err());
    assert_eq!(fixture.queue.status().unwrap(), 0);

    drop(held);
    let response = fixture.post(&path, json!({ "requester_id": 3 })).await;
    assert_status!(response, StatusCode::CREATED);
    assert_json_path!(response.body, "url", json!("https://youtu.be/held"));
    assert_eq!(fixture.queue.status().unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_reference_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/v1/pending/00000000000000000000000000000000/confirm",
            json!({ "requester_id": 3 }),
        )
        .await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_pending_rejects_bad_url() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/pending", json!({ "url": "javascript:alert(1)" }))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Preferences
// =============================================================================

#[tokio::test]
async fn test_preferences_default() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/preferences/99").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body, json!({ "quality": "best", "media_type": "video" }));
}

#[tokio::test]
async fn test_preferences_stay_consistent() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .put("/api/v1/preferences/5/quality", json!({ "quality": "audio" }))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body, json!({ "quality": "audio", "media_type": "audio" }));

    let response = fixture
        .put("/api/v1/preferences/5/media-type", json!({ "media_type": "video" }))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body, json!({ "quality": "best", "media_type": "video" }));

    let response = fixture
        .put("/api/v1/preferences/5/quality", json!({ "quality": "1080p" }))
        .await;
    assert_eq!(response.body, json!({ "quality": "1080p", "media_type": "video" }));

    let response = fixture.get("/api/v1/preferences/5").await;
    assert_eq!(response.body, json!({ "quality": "1080p", "media_type": "video" }));
}

#[tokio::test]
async fn test_preferences_reject_unknown_values() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .put("/api/v1/preferences/5/quality", json!({ "quality": "8k" }))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let response = fixture
        .put("/api/v1/preferences/5/media-type", json!({ "media_type": "gif" }))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Pool
// =============================================================================

#[tokio::test]
async fn test_pool_status_idle() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/pool/status").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "running", json!(false));
    assert_json_path!(response.body, "worker_count", json!(2));
    assert_json_path!(response.body, "admission_capacity", json!(4));
    assert_json_path!(response.body, "admission_available", json!(4));
    assert_json_path!(response.body, "total_processed", json!(0));
}

#[tokio::test]
async fn test_submitted_job_delivered_end_to_end() {
    let fixture = TestFixture::new().await;
    fixture.pool.start().await;

    let response = fixture
        .post(
            "/api/v1/jobs",
            json!({ "url": "https://www.youtube.com/watch?v=abc", "requester_id": 12 }),
        )
        .await;
    assert_status!(response, StatusCode::CREATED);

    let mut delivered = false;
    for _ in 0..200 {
        if fixture.delivery.delivery_count().await == 1 {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(delivered, "job was not delivered in time");

    let deliveries = fixture.delivery.recorded_deliveries().await;
    assert_eq!(deliveries[0].requester, 12);

    fixture.pool.shutdown().await;
    let status = fixture.get("/api/v1/pool/status").await;
    assert_json_path!(status.body, "running", json!(false));
    assert_json_path!(status.body, "total_delivered", json!(1));
}
