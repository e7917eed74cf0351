//! Source platform detection and per-platform tool options.

use serde::Serialize;
use url::Url;

/// Platforms with dedicated handling. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    TikTok,
    Instagram,
    YouTube,
    Other,
}

impl Platform {
    /// Detect the platform from a URL's host. Unparseable URLs are `Other`.
    pub fn detect(url: &str) -> Self {
        let Some(host) = Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        else {
            return Platform::Other;
        };

        let matches = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

        if matches("tiktok.com") {
            Platform::TikTok
        } else if matches("instagram.com") || matches("instagr.am") {
            Platform::Instagram
        } else if matches("youtube.com") || matches("youtu.be") {
            Platform::YouTube
        } else {
            Platform::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::YouTube => "youtube",
            Platform::Other => "other",
        }
    }
}

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const TIKTOK_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("DNT", "1"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
    (
        "sec-ch-ua",
        "\"Google Chrome\";v=\"131\", \"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
];

/// Network options passed to the fetch tool for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteOptions {
    pub platform: Platform,
    pub skip_certificate_check: bool,
    pub force_ipv4: bool,
    pub legacy_server_connect: bool,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl SiteOptions {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::TikTok => Self {
                platform,
                skip_certificate_check: true,
                force_ipv4: true,
                legacy_server_connect: true,
                user_agent: Some(CHROME_USER_AGENT.to_string()),
                referer: Some("https://www.tiktok.com/".to_string()),
                headers: TIKTOK_HEADERS
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
            _ => Self {
                platform,
                skip_certificate_check: false,
                force_ipv4: false,
                legacy_server_connect: true,
                user_agent: None,
                referer: None,
                headers: Vec::new(),
            },
        }
    }

    pub fn for_url(url: &str) -> Self {
        Self::for_platform(Platform::detect(url))
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.skip_certificate_check {
            args.push("--no-check-certificate".to_string());
        }
        if self.force_ipv4 {
            args.push("-4".to_string());
        }
        if self.legacy_server_connect {
            args.push("--legacy-server-connect".to_string());
        }
        if let Some(ua) = &self.user_agent {
            args.push("--user-agent".to_string());
            args.push(ua.clone());
        }
        if let Some(referer) = &self.referer {
            args.push("--referer".to_string());
            args.push(referer.clone());
        }
        for (name, value) in &self.headers {
            args.push("--add-header".to_string());
            args.push(format!("{}:{}", name, value));
        }
        args
    }
}
