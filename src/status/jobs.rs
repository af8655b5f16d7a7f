use super::artifacts::{file_name, list_matching, read_json, NamePattern};
use std::path::Path;

/// `job_<vault>.json`, written when an inventory retrieval job is initiated.
pub(crate) const JOB_FILE: NamePattern = NamePattern::new("job_", ".json");

/// A retrieval job found on disk, before its status is probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobRef {
    pub vault_id: String,
    pub job_id: Option<String>,
}

/// Enumerate job files in `dir`. The vault comes from the file name.
///
/// Files that are not a JSON object are skipped. An object whose `jobId` is
/// absent or not a string is kept with no job id.
pub(crate) fn read_jobs(dir: &Path) -> Vec<JobRef> {
    list_matching(dir, JOB_FILE)
        .into_iter()
        .filter_map(|path| {
            let vault_id = file_name(&path).and_then(|n| JOB_FILE.capture(n))?.to_string();
            let doc = match read_json::<serde_json::Value>(&path) {
                Ok(serde_json::Value::Object(doc)) => doc,
                Ok(_) => {
                    tracing::warn!("skipping job file {}: not a JSON object", path.display());
                    return None;
                }
                Err(e) => {
                    tracing::warn!("skipping job file: {e}");
                    return None;
                }
            };
            let job_id = match doc.get("jobId") {
                Some(serde_json::Value::String(id)) => Some(id.clone()),
                None => None,
                Some(other) => {
                    tracing::warn!("{}: jobId is not a string: {other}", path.display());
                    None
                }
            };
            Some(JobRef { vault_id, job_id })
        })
        .collect()
}
