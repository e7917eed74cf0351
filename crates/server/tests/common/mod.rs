//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router over a
//! real queue and key/value store, with a worker pool wired to mock collaborators,
//! so the HTTP surface can be exercised without yt-dlp or a Bot API server.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use grabber_core::{
    load_config_from_str, ExecutionPipeline, PendingRequestStore, PreferenceStore, ResourceGate,
    SqliteJobQueue, SqliteKvStore, WorkerConfig, WorkerPool,
    testing::{fixtures, MockDelivery, MockFetchTool, StaticMemoryProbe},
};
use grabber_server::state::AppState;

/// Requester whose jobs go to the high-priority lane.
pub const PRIORITY_REQUESTER: i64 = 4242;

/// Test fixture for API testing with mock dependencies.
///
/// The worker pool is not started unless asked for, so submitted jobs stay in
/// the queue where tests can see them.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/jobs", json!({
///         "url": "https://youtu.be/abc",
///         "requester_id": 1
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub pool: Arc<WorkerPool>,
    pub queue: Arc<SqliteJobQueue>,
    pub kv: Arc<SqliteKvStore>,
    /// Mock fetch tool - control fetch results
    pub fetcher: Arc<MockFetchTool>,
    /// Mock transport - inspect deliveries and notices
    pub delivery: Arc<MockDelivery>,
    /// Temporary directory for test database and staging files
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with an idle pool.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let mut config = load_config_from_str(&format!(
            r#"
[telegram]
bot_token = "123:test-token"

[server]
host = "127.0.0.1"
port = 8080
priority_requesters = [{}]
"#,
            PRIORITY_REQUESTER
        ))
        .expect("Failed to parse test config");
        config.database.path = db_path.clone();
        config.workers = WorkerConfig::default().with_count(2).with_fast_timings();

        let queue = Arc::new(SqliteJobQueue::new(&db_path).expect("Failed to create queue"));
        let kv = Arc::new(SqliteKvStore::new(&db_path).expect("Failed to create kv store"));

        let fetcher = Arc::new(MockFetchTool::new());
        let delivery = Arc::new(MockDelivery::new());
        let pipeline = ExecutionPipeline::new(
            fetcher.clone(),
            delivery.clone(),
            fixtures::fetcher_config(&temp_dir.path().join("staging")),
        );
        let gate = ResourceGate::new(Arc::new(StaticMemoryProbe::new(u64::MAX)), 0);

        let pool = Arc::new(WorkerPool::new(
            config.workers.clone(),
            queue.clone(),
            Arc::new(gate),
            Arc::new(pipeline),
            delivery.clone(),
        ));

        let state = Arc::new(AppState::new(
            config,
            queue.clone(),
            Arc::clone(&pool),
            PendingRequestStore::new(Arc::clone(&kv)),
            PreferenceStore::new(Arc::clone(&kv)),
        ));

        // Create router
        let router = grabber_server::api::create_router(state);

        Self {
            router,
            pool,
            queue,
            kv,
            fetcher,
            delivery,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request and return the body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
