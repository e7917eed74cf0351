//! Per-job staging directory bookkeeping.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

use crate::job::JobId;

/// Owns every file a job creates in the staging directory.
///
/// Dropping the scope removes staged credentials, the resolved artifact, and any
/// leftover file whose name starts with the job id. This runs on every exit path,
/// including when the pipeline future is dropped mid-flight.
pub struct StagingScope {
    dir: PathBuf,
    job_prefix: String,
    credentials: Vec<TempPath>,
    artifact: Option<PathBuf>,
}

impl StagingScope {
    pub fn new(dir: impl Into<PathBuf>, job_id: &JobId) -> Self {
        Self {
            dir: dir.into(),
            job_prefix: job_id.to_string(),
            credentials: Vec::new(),
            artifact: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy a credential file into a private, uniquely named file in the staging
    /// directory and return the copy's path.
    pub fn stage_credentials(&mut self, source: &Path) -> io::Result<PathBuf> {
        let mut staged = tempfile::Builder::new()
            .prefix(&format!("cookies_{}_", self.job_prefix))
            .suffix(".txt")
            .tempfile_in(&self.dir)?;
        io::copy(&mut File::open(source)?, staged.as_file_mut())?;

        let path = staged.into_temp_path();
        let staged_path = path.to_path_buf();
        self.credentials.push(path);
        Ok(staged_path)
    }

    /// Record the artifact so it is removed when the scope ends.
    pub fn set_artifact(&mut self, path: PathBuf) {
        self.artifact = Some(path);
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }
}

impl Drop for StagingScope {
    fn drop(&mut self) {
        for credential in self.credentials.drain(..) {
            if let Err(e) = credential.close() {
                warn!(error = %e, "Failed to remove staged credentials");
            }
        }

        if let Some(artifact) = self.artifact.take() {
            remove_quietly(&artifact);
        }

        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            if entry
                .file_name()
                .to_string_lossy()
                .starts_with(&self.job_prefix)
            {
                remove_quietly(&entry.path());
            }
        }
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed staged file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged file"),
    }
}
