use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub home: PathBuf,
    pub data_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub web_dir: PathBuf,
    pub region: String,
    pub account_id: String,
    pub aws_bin: String,
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    pub log_lines: usize,
}

impl DashboardConfig {
    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_dir)
    }
}

/// Locations of the artifacts written by the deletion scripts.
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub vault_list: PathBuf,
    pub jobs_dir: PathBuf,
    pub inventory_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            vault_list: data_dir.join("glacier.json"),
            jobs_dir: data_dir.to_path_buf(),
            inventory_dir: data_dir.join("glacier_inventory"),
            logs_dir: data_dir.join("glacier_logs"),
        }
    }
}

/// Vault entry exactly as listed by `aws glacier list-vaults`.
pub type VaultRecord = serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub completed: bool,
    pub status_code: String,
    pub status_message: String,
}

impl JobStatus {
    pub const UNKNOWN_CODE: &'static str = "Unknown";

    /// Status reported when the remote service could not be asked.
    pub fn unknown(reason: impl Into<String>) -> Self {
        let mut status_message = reason.into();
        if status_message.trim().is_empty() {
            status_message = "status check failed".to_string();
        }
        Self {
            completed: false,
            status_code: Self::UNKNOWN_CODE.to_string(),
            status_message,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.status_code == Self::UNKNOWN_CODE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "vault")]
    pub vault_id: String,
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeletionProgress {
    pub total: u64,
    pub deleted: u64,
    pub remaining: u64,
    #[serde(rename = "progress")]
    pub progress_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTail {
    #[serde(rename = "latest_log_file", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(rename = "logs")]
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub timestamp: String,
    pub vaults: Vec<VaultRecord>,
    pub jobs: Vec<JobRecord>,
    pub deletion_progress: BTreeMap<String, DeletionProgress>,
    #[serde(flatten)]
    pub logs: LogTail,
    #[serde(rename = "running_processes")]
    pub running_workflows: Vec<String>,
}
