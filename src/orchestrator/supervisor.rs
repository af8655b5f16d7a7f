//! Background execution of workflow scripts.
//!
//! At most one instance per script runs at a time. The registry slot is taken
//! synchronously inside `launch`, before the process is spawned, and is given
//! back by the detached task when the process exits, whatever the outcome.

use super::workflow::Workflow;
use crate::error::LaunchError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::process::Command;

/// A registry entry for a script that is currently running.
#[derive(Debug, Clone)]
pub struct RunningWorkflow {
    /// Route name that launched the script, e.g. `delete-dry-run`.
    pub route: String,
    pub args: Vec<String>,
    pub started_at: Instant,
}

struct Inner {
    scripts_dir: PathBuf,
    work_dir: PathBuf,
    running: Mutex<BTreeMap<String, RunningWorkflow>>,
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, BTreeMap<String, RunningWorkflow>> {
        // Entries are plain data; a panic while holding the lock cannot leave one half-written.
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases a registry slot when dropped.
struct Slot {
    inner: Arc<Inner>,
    script: String,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let entry = self.inner.registry().remove(&self.script);
        if let Some(entry) = entry {
            let ran_for = std::time::Duration::from_secs(entry.started_at.elapsed().as_secs());
            tracing::info!(
                script = %self.script,
                route = %entry.route,
                args = ?entry.args,
                "workflow slot released after {}",
                humantime::format_duration(ran_for)
            );
        }
    }
}

/// Shared handle to the workflow registry.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    pub fn new(scripts_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                scripts_dir: scripts_dir.into(),
                work_dir: work_dir.into(),
                running: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn launch_workflow(&self, workflow: Workflow) -> Result<(), LaunchError> {
        self.launch(workflow.route(), workflow.script(), workflow.args())
    }

    /// Start `script` from the scripts directory in the background, recording
    /// `route` as the name it was requested under.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn launch<S: AsRef<str>>(
        &self,
        route: &str,
        script: &str,
        args: &[S],
    ) -> Result<(), LaunchError> {
        let path = self.inner.scripts_dir.join(script);
        if !path.is_file() {
            return Err(LaunchError::NotFound {
                script: script.to_string(),
                path,
            });
        }

        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        {
            let mut registry = self.inner.registry();
            if registry.contains_key(script) {
                return Err(LaunchError::AlreadyRunning {
                    script: script.to_string(),
                });
            }
            registry.insert(
                script.to_string(),
                RunningWorkflow {
                    route: route.to_string(),
                    args: args.clone(),
                    started_at: Instant::now(),
                },
            );
        }

        let slot = Slot {
            inner: self.inner.clone(),
            script: script.to_string(),
        };
        let work_dir = self.inner.work_dir.clone();
        tracing::debug!(route, script, "workflow slot taken");
        tokio::spawn(async move {
            run_to_completion(&slot.script, &path, &args, &work_dir).await;
            drop(slot);
        });

        Ok(())
    }

    /// Names of the scripts currently running, sorted.
    pub fn list_running(&self) -> Vec<String> {
        self.inner.registry().keys().cloned().collect()
    }

    #[cfg(test)]
    pub fn is_running(&self, script: &str) -> bool {
        self.inner.registry().contains_key(script)
    }

    #[cfg(test)]
    fn running_entry(&self, script: &str) -> Option<RunningWorkflow> {
        self.inner.registry().get(script).cloned()
    }
}

async fn run_to_completion(script: &str, path: &Path, args: &[String], work_dir: &Path) {
    tracing::info!(script, ?args, "starting workflow");

    let output = Command::new(path)
        .args(args)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    match output {
        Ok(output) => {
            tracing::debug!(
                script,
                stdout_bytes = output.stdout.len(),
                stderr_bytes = output.stderr.len(),
                "workflow output captured"
            );
            if output.status.success() {
                tracing::info!(script, "workflow finished with {}", output.status);
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
                tracing::warn!(script, "workflow finished with {}: {last}", output.status);
            }
        }
        Err(e) => {
            tracing::error!(script, "failed to run workflow {}: {e}", path.display());
        }
    }
}
