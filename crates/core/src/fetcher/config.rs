//! Configuration for the fetcher module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform::Platform;

/// Configuration for the yt-dlp based fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Path to the yt-dlp binary.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Fast scratch directory for downloads and staged credentials.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Timeout for a single download in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Timeout for a title query in seconds.
    #[serde(default = "default_title_timeout")]
    pub title_timeout_secs: u64,

    /// Largest artifact that will be delivered.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// External downloader handed to yt-dlp. Empty disables it.
    #[serde(default = "default_external_downloader")]
    pub external_downloader: String,

    #[serde(default = "default_external_downloader_args")]
    pub external_downloader_args: String,

    #[serde(default)]
    pub cookies: CookiesConfig,
}

fn default_binary() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("/dev/shm/videos")
}

fn default_timeout() -> u64 {
    1800
}

fn default_title_timeout() -> u64 {
    60
}

fn default_max_file_size_mb() -> u64 {
    2048
}

fn default_external_downloader() -> String {
    "aria2c".to_string()
}

fn default_external_downloader_args() -> String {
    "aria2c:-j16 -x16 -s16 --file-allocation=falloc --stream-piece-selector=geom --max-download-limit=0"
        .to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            staging_dir: default_staging_dir(),
            timeout_secs: default_timeout(),
            title_timeout_secs: default_title_timeout(),
            max_file_size_mb: default_max_file_size_mb(),
            external_downloader: default_external_downloader(),
            external_downloader_args: default_external_downloader_args(),
            cookies: CookiesConfig::default(),
        }
    }
}

impl FetcherConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn with_max_file_size_mb(mut self, mb: u64) -> Self {
        self.max_file_size_mb = mb;
        self
    }

    pub fn with_cookies(mut self, cookies: CookiesConfig) -> Self {
        self.cookies = cookies;
        self
    }
}

/// Cookie files in Netscape format, per platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CookiesConfig {
    #[serde(default)]
    pub tiktok: Option<PathBuf>,
    #[serde(default)]
    pub instagram: Option<PathBuf>,
    #[serde(default)]
    pub youtube: Option<PathBuf>,
    /// Used when the platform has no file of its own.
    #[serde(default)]
    pub fallback: Option<PathBuf>,
}

impl CookiesConfig {
    /// Cookie file to use for a platform, if one is configured and exists.
    pub fn for_platform(&self, platform: Platform) -> Option<PathBuf> {
        let specific = match platform {
            Platform::TikTok => self.tiktok.as_ref(),
            Platform::Instagram => self.instagram.as_ref(),
            Platform::YouTube => self.youtube.as_ref(),
            Platform::Other => None,
        };
        specific
            .filter(|p| p.is_file())
            .or_else(|| self.fallback.as_ref().filter(|p| p.is_file()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = FetcherConfig::default();
        assert_eq!(config.binary, PathBuf::from("yt-dlp"));
        assert_eq!(config.max_file_size_bytes(), 2048 * 1024 * 1024);
        assert_eq!(config.external_downloader, "aria2c");
    }

    #[test]
    fn test_cookies_prefer_platform_file() {
        let dir = TempDir::new().unwrap();
        let tiktok = dir.path().join("tiktok.txt");
        let fallback = dir.path().join("cookies.txt");
        std::fs::write(&tiktok, "# Netscape").unwrap();
        std::fs::write(&fallback, "# Netscape").unwrap();

        let cookies = CookiesConfig {
            tiktok: Some(tiktok.clone()),
            fallback: Some(fallback.clone()),
            ..Default::default()
        };

        assert_eq!(cookies.for_platform(Platform::TikTok), Some(tiktok));
        assert_eq!(cookies.for_platform(Platform::YouTube), Some(fallback.clone()));
        assert_eq!(cookies.for_platform(Platform::Other), Some(fallback));
    }

    #[test]
    fn test_missing_cookie_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let cookies = CookiesConfig {
            instagram: Some(dir.path().join("missing.txt")),
            ..Default::default()
        };
        assert_eq!(cookies.for_platform(Platform::Instagram), None);
    }
}
