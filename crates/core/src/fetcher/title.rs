//! Filesystem-safe artifact names derived from media titles.

use chrono::{DateTime, Utc};

/// File names are limited in bytes, not characters.
const MAX_TITLE_BYTES: usize = 220;
const FALLBACK_PREFIX: &str = "audio_";
const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

/// Make a title safe to use as a file stem.
///
/// Invalid characters become `_` and any whitespace becomes a space. Runs of
/// spaces or underscores collapse to one, leading and trailing dots and spaces
/// are trimmed, and the result is capped at 220 bytes on a char boundary.
pub fn sanitize_title(raw: &str) -> String {
    let replaced: String = raw
        .trim()
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) {
                '_'
            } else if c.is_whitespace() {
                ' '
            } else {
                c
            }
        })
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    let mut prev: Option<char> = None;
    for c in replaced.chars() {
        if (c == ' ' || c == '_') && prev == Some(c) {
            continue;
        }
        collapsed.push(c);
        prev = Some(c);
    }

    let trimmed = collapsed.trim_matches(|c| c == ' ' || c == '.');
    truncate_bytes(trimmed, MAX_TITLE_BYTES)
        .trim_end_matches([' ', '.'])
        .to_string()
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max)
        .last()
        .unwrap_or(0);
    &s[..end]
}

/// Name used when no title could be obtained.
pub fn fallback_title(now: DateTime<Utc>) -> String {
    format!("{}{}", FALLBACK_PREFIX, now.timestamp())
}

/// Whether `stem` has the `audio_<digits>` shape produced by [`fallback_title`].
pub fn is_fallback_title(stem: &str) -> bool {
    stem.strip_prefix(FALLBACK_PREFIX)
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_replaces_invalid_characters() {
        assert_eq!(sanitize_title("AC/DC: Back in Black?"), "AC_DC_ Back in Black_");
    }

    #[test]
    fn test_collapses_runs() {
        assert_eq!(sanitize_title("a    b"), "a b");
        assert_eq!(sanitize_title("a//b"), "a_b");
        assert_eq!(sanitize_title("a__ __b"), "a_ _b");
    }

    #[test]
    fn test_trims_dots_and_spaces() {
        assert_eq!(sanitize_title("  ..hidden title.. "), "hidden title");
        assert_eq!(sanitize_title("..."), "");
    }

    #[test]
    fn test_whitespace_normalized() {
        assert_eq!(sanitize_title("a\t\tb"), "a b");
        assert_eq!(sanitize_title("a \u{00a0}\n b"), "a b");
        assert_eq!(sanitize_title("\tlead and trail\r\n"), "lead and trail");
    }

    #[test]
    fn test_caps_length_in_bytes() {
        let sanitized = sanitize_title(&"Я".repeat(300));
        assert!(sanitized.len() <= MAX_TITLE_BYTES);
        assert_eq!(sanitized, "Я".repeat(110));

        // 3-byte chars do not divide 220 evenly
        let sanitized = sanitize_title(&"音".repeat(100));
        assert_eq!(sanitized, "音".repeat(73));
        assert!(std::str::from_utf8(sanitized.as_bytes()).is_ok());

        let ascii = "a".repeat(300);
        assert_eq!(sanitize_title(&ascii).len(), MAX_TITLE_BYTES);
    }

    #[test]
    fn test_long_title_fits_in_file_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let title = sanitize_title(&"Я".repeat(300));
        let path = dir.path().join(format!("{}.mp3", title));
        std::fs::write(&path, b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_fallback_title() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let name = fallback_title(now);
        assert_eq!(name, "audio_1704067200");
        assert!(is_fallback_title(&name));
    }

    #[test]
    fn test_is_fallback_title() {
        assert!(!is_fallback_title("audio_"));
        assert!(!is_fallback_title("audio_book"));
        assert!(!is_fallback_title("Some Song"));
    }
}
