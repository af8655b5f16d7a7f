use super::artifacts::read_json;
use crate::model::VaultRecord;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct VaultListFile {
    #[serde(rename = "VaultList", default)]
    vault_list: Vec<VaultRecord>,
}

/// Read the vault list captured from `aws glacier list-vaults`.
pub(crate) fn read_vaults(path: &Path) -> Vec<VaultRecord> {
    match read_json::<VaultListFile>(path) {
        Ok(file) => file.vault_list,
        Err(e) if e.is_missing() => Vec::new(),
        Err(e) => {
            tracing::warn!("skipping vault list: {e}");
            Vec::new()
        }
    }
}
