use super::artifacts::{file_name, list_matching, read_json, NamePattern};
use crate::metrics;
use crate::model::DeletionProgress;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const WORKING_SUFFIX: &str = ".working.json";
const BASELINE_SUFFIX: &str = ".json";
const INVENTORY_PREFIX: &str = "inventory_";

/// Any `*.working.json` file in the inventory directory.
const WORKING_FILE: NamePattern = NamePattern::new("", WORKING_SUFFIX);

#[derive(Debug, Deserialize)]
struct InventoryFile {
    #[serde(rename = "ArchiveList", default)]
    archive_list: Vec<serde_json::Value>,
}

/// `inventory_<vault>.working.json` → `<vault>`; the prefix is optional.
fn vault_id_for(working_name: &str) -> Option<&str> {
    let stem = WORKING_FILE.capture(working_name)?;
    Some(stem.strip_prefix(INVENTORY_PREFIX).unwrap_or(stem))
}

/// `<dir>/<stem>.working.json` → `<dir>/<stem>.json`.
fn baseline_path_for(working: &Path, working_name: &str) -> Option<PathBuf> {
    let stem = WORKING_FILE.capture(working_name)?;
    Some(working.with_file_name(format!("{stem}{BASELINE_SUFFIX}")))
}

fn archive_count(path: &Path) -> Result<u64, crate::error::ArtifactError> {
    read_json::<InventoryFile>(path).map(|inv| inv.archive_list.len() as u64)
}

/// Pair every working inventory with its baseline and compute progress per vault.
pub(crate) fn read_progress(inventory_dir: &Path) -> BTreeMap<String, DeletionProgress> {
    let mut progress = BTreeMap::new();

    for working in list_matching(inventory_dir, WORKING_FILE) {
        let Some(name) = file_name(&working) else {
            continue;
        };
        let (Some(vault_id), Some(baseline)) =
            (vault_id_for(name), baseline_path_for(&working, name))
        else {
            continue;
        };

        let remaining = match archive_count(&working) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("skipping progress for {vault_id}: {e}");
                continue;
            }
        };
        let total = match archive_count(&baseline) {
            Ok(n) => Some(n),
            Err(e) if e.is_missing() => None,
            Err(e) => {
                tracing::warn!("skipping progress for {vault_id}: {e}");
                continue;
            }
        };

        progress.insert(
            vault_id.to_string(),
            metrics::deletion_progress(total, remaining),
        );
    }

    progress
}
