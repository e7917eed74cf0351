//! yt-dlp based fetch tool.

use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::config::FetcherConfig;
use super::error::FetchError;
use super::traits::{FetchOutput, FetchRequest, FetchTool, TitleQuery};

/// Fetch tool that shells out to yt-dlp.
pub struct YtDlp {
    config: FetcherConfig,
}

impl YtDlp {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FetcherConfig::default())
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    fn build_title_args(&self, query: &TitleQuery) -> Vec<String> {
        let mut args = vec![
            "--no-cache-dir".to_string(),
            "--no-warnings".to_string(),
            "--print".to_string(),
            "%(title)s".to_string(),
        ];
        args.extend(query.site.to_args());
        if let Some(cookies) = &query.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().into_owned());
        }
        args.push(query.url.clone());
        args
    }

    fn build_fetch_args(&self, request: &FetchRequest) -> Vec<String> {
        let mut args = vec!["--no-cache-dir".to_string()];

        if !self.config.external_downloader.is_empty() {
            args.push("--external-downloader".to_string());
            args.push(self.config.external_downloader.clone());
            if !self.config.external_downloader_args.is_empty() {
                args.push("--external-downloader-args".to_string());
                args.push(self.config.external_downloader_args.clone());
            }
        }

        args.push("-o".to_string());
        args.push(request.output_template.to_string_lossy().into_owned());
        args.push("--no-cookies-from-browser".to_string());

        args.extend(request.site.to_args());
        args.extend(request.format.to_args());

        if let Some(cookies) = &request.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().into_owned());
        }

        args.push(request.url.clone());
        args
    }

    /// Spawn the tool and wait for it, honouring `timeout` and `cancel`.
    ///
    /// The child is killed if this future is dropped before it exits.
    async fn run(
        &self,
        args: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Output, FetchError> {
        let child = Command::new(&self.config.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::ToolNotFound {
                        path: self.config.binary.clone(),
                    }
                } else {
                    FetchError::Io(e)
                }
            })?;

        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = tokio::time::timeout(timeout, child.wait_with_output()) => match result {
                Ok(output) => Ok(output?),
                Err(_) => Err(FetchError::Timeout {
                    timeout_secs: timeout.as_secs(),
                }),
            },
        }
    }
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}

#[async_trait]
impl FetchTool for YtDlp {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn query_title(
        &self,
        query: &TitleQuery,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let args = self.build_title_args(query);
        let timeout = Duration::from_secs(self.config.title_timeout_secs);
        let output = self.run(&args, timeout, cancel).await?;

        if !output.status.success() {
            return Err(FetchError::failed(
                output.status.code(),
                combined_output(&output),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let title = stdout.lines().next().unwrap_or("").trim();
        if title.is_empty() {
            return Err(FetchError::EmptyTitle);
        }
        Ok(title.to_string())
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchOutput, FetchError> {
        let args = self.build_fetch_args(request);
        debug!(job_id = %request.job_id, args = ?args, "Running yt-dlp");

        let start = Instant::now();
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = self.run(&args, timeout, cancel).await?;
        let text = combined_output(&output);

        if !output.status.success() {
            return Err(FetchError::failed(output.status.code(), text));
        }

        Ok(FetchOutput {
            output: text,
            elapsed: start.elapsed(),
        })
    }

    async fn validate(&self) -> Result<(), FetchError> {
        let result = Command::new(&self.config.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                return Err(FetchError::failed(
                    output.status.code(),
                    combined_output(&output),
                ))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::ToolNotFound {
                    path: self.config.binary.clone(),
                });
            }
            Err(e) => return Err(FetchError::Io(e)),
        }

        tokio::fs::create_dir_all(&self.config.staging_dir).await?;
        Ok(())
    }
}
