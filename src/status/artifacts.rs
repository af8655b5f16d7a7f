//! Shared helpers for reading the JSON and log files the scripts leave behind.

use crate::error::ArtifactError;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// File name convention `<prefix><id><suffix>`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NamePattern {
    pub prefix: &'static str,
    pub suffix: &'static str,
}

impl NamePattern {
    pub const fn new(prefix: &'static str, suffix: &'static str) -> Self {
        Self { prefix, suffix }
    }

    /// Return the `<id>` part of a matching file name.
    pub fn capture<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        file_name
            .strip_prefix(self.prefix)?
            .strip_suffix(self.suffix)
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.capture(file_name).is_some()
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let raw = std::fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| ArtifactError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// List regular files in `dir` whose names match `pattern`, sorted by name.
/// Symlinks count when their target is a regular file. A missing or
/// unreadable directory yields an empty list.
pub(crate) fn list_matching(dir: &Path, pattern: NamePattern) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("cannot list {}: {e}", dir.display());
            }
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| pattern.matches(name))
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}

pub(crate) fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
