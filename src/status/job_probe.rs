//! Remote job status lookups.
//!
//! Every failure mode (spawn error, timeout, non-zero exit, unparsable body)
//! collapses into [`JobStatus::unknown`]; a probe never fails the caller.

use crate::model::{DashboardConfig, JobStatus};
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[async_trait]
pub trait JobStatusProbe: Send + Sync {
    async fn check(&self, vault_id: &str, job_id: &str) -> JobStatus;
}

/// Shape of `aws glacier describe-job` output; only the fields we report.
#[derive(Debug, Deserialize)]
struct DescribeJobOutput {
    #[serde(rename = "Completed", default)]
    completed: bool,
    #[serde(rename = "StatusCode")]
    status_code: Option<String>,
    #[serde(rename = "StatusMessage")]
    status_message: Option<String>,
}

impl From<DescribeJobOutput> for JobStatus {
    fn from(out: DescribeJobOutput) -> Self {
        JobStatus {
            completed: out.completed,
            status_code: out
                .status_code
                .unwrap_or_else(|| JobStatus::UNKNOWN_CODE.to_string()),
            status_message: out.status_message.unwrap_or_default(),
        }
    }
}

/// Asks Glacier through the AWS CLI.
#[derive(Debug, Clone)]
pub struct AwsCliProbe {
    aws_bin: String,
    region: String,
    account_id: String,
    timeout: Duration,
}

impl AwsCliProbe {
    pub fn new(
        aws_bin: impl Into<String>,
        region: impl Into<String>,
        account_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            aws_bin: aws_bin.into(),
            region: region.into(),
            account_id: account_id.into(),
            timeout,
        }
    }

    pub fn from_config(cfg: &DashboardConfig) -> Self {
        Self::new(
            cfg.aws_bin.clone(),
            cfg.region.clone(),
            cfg.account_id.clone(),
            cfg.probe_timeout,
        )
    }

    async fn describe_job(&self, vault_id: &str, job_id: &str) -> Result<JobStatus, String> {
        let mut cmd = Command::new(&self.aws_bin);
        cmd.args(["glacier", "describe-job", "--account-id"])
            .arg(&self.account_id)
            .arg("--vault-name")
            .arg(vault_id)
            .arg("--job-id")
            .arg(job_id)
            .arg("--region")
            .arg(&self.region)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(format!("cannot run {}: {e}", self.aws_bin)),
            Err(_) => {
                return Err(format!(
                    "status check timed out after {}",
                    humantime::format_duration(self.timeout)
                ))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(if detail.is_empty() {
                format!("status check exited with {}", output.status)
            } else {
                format!("status check exited with {}: {detail}", output.status)
            });
        }

        serde_json::from_slice::<DescribeJobOutput>(&output.stdout)
            .map(JobStatus::from)
            .map_err(|e| format!("unreadable status response: {e}"))
    }
}

#[async_trait]
impl JobStatusProbe for AwsCliProbe {
    async fn check(&self, vault_id: &str, job_id: &str) -> JobStatus {
        match self.describe_job(vault_id, job_id).await {
            Ok(status) => status,
            Err(reason) => {
                tracing::warn!(vault = vault_id, job = job_id, "job status unknown: {reason}");
                JobStatus::unknown(reason)
            }
        }
    }
}
