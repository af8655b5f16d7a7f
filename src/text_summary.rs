//! Text summary builder for CLI output.
//!
//! This module formats a status snapshot into human-readable lines for text mode.

use crate::model::StatusSnapshot;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn vault_label(vault: &serde_json::Value) -> String {
    let name = vault
        .get("VaultName")
        .and_then(|v| v.as_str())
        .unwrap_or("?");
    match vault.get("NumberOfArchives").and_then(|v| v.as_u64()) {
        Some(n) => format!("{name} ({n} archives)"),
        None => name.to_string(),
    }
}

/// Build a text summary from a snapshot.
pub(crate) fn build_text_summary(snapshot: &StatusSnapshot) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!("Status at {}", snapshot.timestamp));

    lines.push(format!("Vaults: {}", snapshot.vaults.len()));
    for vault in &snapshot.vaults {
        lines.push(format!("  {}", vault_label(vault)));
    }

    lines.push(format!("Jobs: {}", snapshot.jobs.len()));
    for job in &snapshot.jobs {
        let state = if job.status.completed {
            "completed"
        } else if job.status.is_unknown() {
            "unreachable"
        } else {
            "pending"
        };
        let mut line = format!(
            "  {}: {} {} ({state})",
            job.vault_id,
            job.job_id.as_deref().unwrap_or("-"),
            job.status.status_code
        );
        if !job.status.status_message.is_empty() {
            line.push_str(&format!(" - {}", job.status.status_message));
        }
        lines.push(line);
    }

    if !snapshot.deletion_progress.is_empty() {
        lines.push("Deletion progress:".to_string());
        for (vault, p) in &snapshot.deletion_progress {
            lines.push(format!(
                "  {vault}: {:.2}% ({}/{} deleted, {} remaining)",
                p.progress_percent, p.deleted, p.total, p.remaining
            ));
        }
    }

    if snapshot.running_workflows.is_empty() {
        lines.push("Running: none".to_string());
    } else {
        lines.push(format!("Running: {}", snapshot.running_workflows.join(", ")));
    }

    if let Some(file) = snapshot.logs.file_name.as_deref() {
        lines.push(format!("Log {file} (last {} lines):", snapshot.logs.lines.len()));
        for line in &snapshot.logs.lines {
            lines.push(format!("  {line}"));
        }
    }

    TextSummary { lines }
}
