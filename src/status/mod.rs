//! Read side of the dashboard.
//!
//! Every request rebuilds the snapshot from the files the deletion scripts
//! write, plus one remote status probe per known job. Nothing here can fail:
//! missing files read as empty, corrupt ones are skipped, and an unreachable
//! remote service shows up as an `Unknown` job status.

mod artifacts;
mod job_probe;
mod jobs;
mod log_tail;
mod progress;
mod vaults;

pub use job_probe::{AwsCliProbe, JobStatusProbe};

use crate::model::{DataLayout, DeletionProgress, JobRecord, JobStatus, LogTail, StatusSnapshot, VaultRecord};
use crate::orchestrator::Supervisor;
use std::collections::BTreeMap;
use std::sync::Arc;
use time::{OffsetDateTime, UtcOffset};

pub(crate) use log_tail::DEFAULT_TAIL_LINES;

/// Everything read from disk in one pass.
#[derive(Debug, Default)]
struct DiskState {
    vaults: Vec<VaultRecord>,
    jobs: Vec<jobs::JobRef>,
    progress: BTreeMap<String, DeletionProgress>,
    logs: LogTail,
}

fn read_disk_state(layout: &DataLayout, log_lines: usize) -> DiskState {
    DiskState {
        vaults: vaults::read_vaults(&layout.vault_list),
        jobs: jobs::read_jobs(&layout.jobs_dir),
        progress: progress::read_progress(&layout.inventory_dir),
        logs: log_tail::tail_latest_log(&layout.logs_dir, log_tail::DELETION_LOG, log_lines),
    }
}

fn now_timestamp(offset: UtcOffset) -> String {
    OffsetDateTime::now_utc()
        .to_offset(offset)
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

pub struct StatusAggregator {
    layout: DataLayout,
    log_lines: usize,
    probe: Arc<dyn JobStatusProbe>,
    supervisor: Supervisor,
    utc_offset: UtcOffset,
}

impl StatusAggregator {
    pub fn new(
        layout: DataLayout,
        log_lines: usize,
        probe: Arc<dyn JobStatusProbe>,
        supervisor: Supervisor,
    ) -> Self {
        Self {
            layout,
            log_lines,
            probe,
            supervisor,
            utc_offset: UtcOffset::UTC,
        }
    }

    /// Offset used for snapshot timestamps; UTC unless set.
    pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Build a fresh snapshot. Always succeeds.
    pub async fn aggregate(&self) -> StatusSnapshot {
        let layout = self.layout.clone();
        let log_lines = self.log_lines;
        let disk = match tokio::task::spawn_blocking(move || read_disk_state(&layout, log_lines)).await {
            Ok(disk) => disk,
            Err(e) => {
                tracing::error!("status read task failed: {e}");
                DiskState::default()
            }
        };

        let probes = disk.jobs.into_iter().map(|job| {
            let probe = self.probe.clone();
            async move {
                let status = match job.job_id.as_deref() {
                    Some(job_id) => probe.check(&job.vault_id, job_id).await,
                    None => JobStatus::unknown("job file has no usable jobId"),
                };
                JobRecord {
                    vault_id: job.vault_id,
                    job_id: job.job_id,
                    status,
                }
            }
        });
        let jobs = futures::future::join_all(probes).await;

        StatusSnapshot {
            timestamp: now_timestamp(self.utc_offset),
            vaults: disk.vaults,
            jobs,
            deletion_progress: disk.progress,
            logs: disk.logs,
            running_workflows: self.supervisor.list_running(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Reports every job as in progress, except vault `down` which is unreachable.
    #[derive(Default)]
    struct FakeProbe {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobStatusProbe for FakeProbe {
        async fn check(&self, vault_id: &str, job_id: &str) -> JobStatus {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if vault_id == "down" {
                return JobStatus::unknown("connection refused");
            }
            JobStatus {
                completed: false,
                status_code: "InProgress".into(),
                status_message: format!("{vault_id}/{job_id}"),
            }
        }
    }

    fn aggregator(data_dir: &Path, probe: Arc<FakeProbe>) -> StatusAggregator {
        StatusAggregator::new(
            DataLayout::new(data_dir),
            DEFAULT_TAIL_LINES,
            probe,
            Supervisor::new(data_dir, data_dir),
        )
    }

    fn inventory(archives: usize) -> String {
        let list: Vec<_> = (0..archives).map(|i| serde_json::json!({"ArchiveId": i})).collect();
        serde_json::json!({"ArchiveList": list}).to_string()
    }

    fn populate(dir: &Path) {
        std::fs::write(
            dir.join("glacier.json"),
            r#"{"VaultList":[{"VaultName":"v1"},{"VaultName":"down"}]}"#,
        )
        .unwrap();
        std::fs::write(dir.join("job_v1.json"), r#"{"jobId":"J1"}"#).unwrap();
        std::fs::write(dir.join("job_down.json"), r#"{"jobId":"J2"}"#).unwrap();
        std::fs::write(dir.join("job_broken.json"), "{{").unwrap();
        let inv = dir.join("glacier_inventory");
        std::fs::create_dir(&inv).unwrap();
        std::fs::write(inv.join("inventory_v1.json"), inventory(100)).unwrap();
        std::fs::write(inv.join("inventory_v1.working.json"), inventory(40)).unwrap();
        let logs = dir.join("glacier_logs");
        std::fs::create_dir(&logs).unwrap();
        std::fs::write(logs.join("deletion_20240101_120000.log"), "start\ndeleted a1\n").unwrap();
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_snapshot() {
        let dir = tempdir().expect("tempdir");
        let snapshot = aggregator(dir.path(), Arc::default()).aggregate().await;
        assert!(snapshot.vaults.is_empty());
        assert!(snapshot.jobs.is_empty());
        assert!(snapshot.deletion_progress.is_empty());
        assert_eq!(snapshot.logs, LogTail::default());
        assert!(snapshot.running_workflows.is_empty());
        assert!(!snapshot.timestamp.is_empty());
    }

    #[tokio::test]
    async fn composes_all_sources() {
        let dir = tempdir().expect("tempdir");
        populate(dir.path());
        let probe = Arc::new(FakeProbe::default());
        let snapshot = aggregator(dir.path(), probe.clone()).aggregate().await;

        assert_eq!(snapshot.vaults.len(), 2);
        assert_eq!(snapshot.jobs.len(), 2);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);

        let v1 = snapshot.jobs.iter().find(|j| j.vault_id == "v1").unwrap();
        assert_eq!(v1.job_id.as_deref(), Some("J1"));
        assert_eq!(v1.status.status_code, "InProgress");

        let down = snapshot.jobs.iter().find(|j| j.vault_id == "down").unwrap();
        assert!(down.status.is_unknown());
        assert!(!down.status.completed);
        assert!(!down.status.status_message.is_empty());

        let progress = snapshot.deletion_progress["v1"];
        assert_eq!(
            (progress.total, progress.deleted, progress.remaining),
            (100, 60, 40)
        );
        assert_eq!(progress.progress_percent, 60.0);

        assert_eq!(
            snapshot.logs.file_name.as_deref(),
            Some("deletion_20240101_120000.log")
        );
        assert_eq!(snapshot.logs.lines, vec!["start", "deleted a1"]);
    }

    #[tokio::test]
    async fn aggregation_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        populate(dir.path());
        let agg = aggregator(dir.path(), Arc::default());

        let first = agg.aggregate().await;
        let second = agg.aggregate().await;
        assert_eq!(first.vaults, second.vaults);
        assert_eq!(first.jobs, second.jobs);
        assert_eq!(first.deletion_progress, second.deletion_progress);
        assert_eq!(first.logs, second.logs);
        assert_eq!(first.running_workflows, second.running_workflows);
    }

    #[tokio::test]
    async fn job_without_id_is_unknown_without_probing() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("job_x.json"), r#"{"location":"/l"}"#).unwrap();
        let probe = Arc::new(FakeProbe::default());
        let snapshot = aggregator(dir.path(), probe.clone()).aggregate().await;

        assert_eq!(snapshot.jobs.len(), 1);
        assert!(snapshot.jobs[0].status.is_unknown());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn numeric_job_id_is_unknown_without_probing() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("job_x.json"), r#"{"jobId": 123}"#).unwrap();
        let probe = Arc::new(FakeProbe::default());
        let snapshot = aggregator(dir.path(), probe.clone()).aggregate().await;

        assert_eq!(snapshot.jobs.len(), 1);
        assert_eq!(snapshot.jobs[0].vault_id, "x");
        assert_eq!(snapshot.jobs[0].job_id, None);
        assert!(snapshot.jobs[0].status.is_unknown());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn timestamp_uses_configured_offset() {
        let dir = tempdir().expect("tempdir");
        let utc = aggregator(dir.path(), Arc::default()).aggregate().await;
        assert!(utc.timestamp.ends_with('Z'), "{}", utc.timestamp);

        let local = aggregator(dir.path(), Arc::default())
            .with_utc_offset(time::macros::offset!(+2))
            .aggregate()
            .await;
        assert!(local.timestamp.ends_with("+02:00"), "{}", local.timestamp);
    }
}
