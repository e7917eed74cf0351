//! Quality and kind to fetch-tool format arguments.

use crate::job::{MediaKind, Quality};

const BEST_VIDEO: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// What the fetch tool should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSpec {
    /// Download a video using the given format selector.
    Video { selector: String },
    /// Extract the audio track as MP3.
    ExtractAudio,
}

impl FormatSpec {
    /// Total mapping from a job's quality and kind. Audio kind wins over quality.
    pub fn resolve(quality: Quality, media_kind: MediaKind) -> Self {
        if media_kind == MediaKind::Audio {
            return FormatSpec::ExtractAudio;
        }
        let selector = match quality.max_height() {
            Some(h) => format!(
                "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best"
            ),
            None => BEST_VIDEO.to_string(),
        };
        FormatSpec::Video { selector }
    }

    pub fn to_args(&self) -> Vec<String> {
        match self {
            FormatSpec::Video { selector } => vec!["--format".to_string(), selector.clone()],
            FormatSpec::ExtractAudio => vec![
                "-x".to_string(),
                "--audio-format".to_string(),
                "mp3".to_string(),
                "--audio-quality".to_string(),
                "0".to_string(),
            ],
        }
    }
}
