//! Telegram Bot API delivery transport.
//!
//! Artifacts are uploaded as multipart bodies streamed from disk, so large files
//! never sit in memory. Notices are rendered to plain text and sent as messages.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Body, Client};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use grabber_core::config::TelegramConfig;
use grabber_core::{DeliveryError, DeliveryTransport, MediaKind, Notice, RequesterId};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Uploads of large files to a local Bot API server can take a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Delivers artifacts and notices through a Bot API server.
pub struct TelegramTransport {
    client: Client,
    /// `{api_base}/bot{token}`
    base_url: String,
}

impl TelegramTransport {
    pub fn new(config: &TelegramConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &TelegramConfig, client: Client) -> Self {
        Self {
            client,
            base_url: format!("{}/bot{}", config.api_base(), config.bot_token),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn check_response(
        method: &str,
        response: reqwest::Response,
    ) -> Result<(), DeliveryError> {
        let status = response.status();
        let body: Option<ApiResponse> = response.json().await.ok();

        match body {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(ApiResponse {
                description: Some(description),
                ..
            }) => Err(DeliveryError::new(format!("{}: {}", method, description))),
            _ => Err(DeliveryError::new(format!("{}: HTTP {}", method, status))),
        }
    }

    async fn upload_part(artifact: &Path) -> Result<multipart::Part, DeliveryError> {
        let file = tokio::fs::File::open(artifact)
            .await
            .map_err(|e| DeliveryError::new(format!("open {}: {}", artifact.display(), e)))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| DeliveryError::new(e.to_string()))?
            .len();
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        Ok(
            multipart::Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len)
                .file_name(file_name),
        )
    }
}

#[async_trait]
impl DeliveryTransport for TelegramTransport {
    async fn deliver(
        &self,
        requester: RequesterId,
        artifact: &Path,
        media_kind: MediaKind,
    ) -> Result<(), DeliveryError> {
        let part = Self::upload_part(artifact).await?;
        let form = multipart::Form::new().text("chat_id", requester.to_string());

        let (method, form) = match media_kind {
            MediaKind::Video => (
                "sendVideo",
                form.text("supports_streaming", "true").part("video", part),
            ),
            MediaKind::Audio => {
                let title = artifact
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                ("sendAudio", form.text("title", title).part("audio", part))
            }
        };

        debug!(requester, method, file = %artifact.display(), "Uploading artifact");
        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DeliveryError::new(format!("{}: {}", method, e)))?;

        Self::check_response(method, response).await
    }

    async fn notify(&self, requester: RequesterId, notice: &Notice) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({
                "chat_id": requester,
                "text": notice.message(),
            }))
            .send()
            .await
            .map_err(|e| DeliveryError::new(format!("sendMessage: {}", e)))?;

        Self::check_response("sendMessage", response)
            .await
            .inspect_err(|e| warn!(requester, error = %e, "Notice not delivered"))
    }
}
