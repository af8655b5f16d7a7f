use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to read one on-disk artifact. Never leaves the `status` module;
/// readers log it and fall back to an empty value.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed JSON in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    pub fn is_missing(&self) -> bool {
        matches!(self, ArtifactError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Reasons a workflow launch is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("script {script} not found")]
    NotFound { script: String, path: PathBuf },
    #[error("script {script} is already running")]
    AlreadyRunning { script: String },
}
