//! Locating the file the fetch tool produced.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Filesystem clocks can lag the wall clock slightly.
const MTIME_SLACK: Duration = Duration::from_secs(1);

const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".aria2", ".temp"];

fn is_partial(name: &str) -> bool {
    PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) || name.contains(".part-Frag")
}

/// First complete file in `dir` whose name starts with `prefix`.
pub async fn find_by_prefix(dir: &Path, prefix: &str) -> io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) && !is_partial(&name) && entry.file_type().await?.is_file() {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found.into_iter().next())
}

/// `<stem>.mp3` if it exists, else the most recently modified `*.mp3` in `dir`
/// written since `fetch_started`. Older files belong to other jobs.
pub async fn find_audio(
    dir: &Path,
    stem: &str,
    fetch_started: SystemTime,
) -> io::Result<Option<PathBuf>> {
    let exact = dir.join(format!("{}.mp3", stem));
    if tokio::fs::try_exists(&exact).await? {
        return Ok(Some(exact));
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("mp3") {
            continue;
        }
        let modified = entry.metadata().await?.modified()?;
        if fetch_started
            .checked_sub(MTIME_SLACK)
            .is_some_and(|floor| modified < floor)
        {
            continue;
        }
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}
