use crate::api::{self, AppState};
use crate::model::DashboardConfig;
use crate::orchestrator::Supervisor;
use crate::status::{AwsCliProbe, StatusAggregator, DEFAULT_TAIL_LINES};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use time::UtcOffset;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "glacier-dashboard",
    version,
    about = "Status dashboard and script launcher for Glacier vault deletion"
)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "DASHBOARD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Install location; defaults to the directory holding this executable
    #[arg(long, env = "GLACIER_DASHBOARD_HOME")]
    pub home: Option<PathBuf>,

    /// Directory with glacier.json, job files, inventories and logs (relative to home)
    #[arg(long, env = "GLACIER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory with the workflow scripts (relative to home)
    #[arg(long, env = "GLACIER_SCRIPTS_DIR")]
    pub scripts_dir: Option<PathBuf>,

    /// Directory with dashboard.html and other web assets (relative to home)
    #[arg(long, env = "GLACIER_WEB_DIR")]
    pub web_dir: Option<PathBuf>,

    /// AWS region passed to job status checks
    #[arg(long, env = "GLACIER_REGION", default_value = "eu-west-1")]
    pub region: String,

    /// AWS account id passed to job status checks
    #[arg(long, default_value = "-")]
    pub account_id: String,

    /// AWS CLI executable
    #[arg(long, env = "AWS_CLI", default_value = "aws")]
    pub aws_bin: String,

    /// Upper bound for one job status check
    #[arg(long, default_value = "10s")]
    pub probe_timeout: humantime::Duration,

    /// Number of log lines included in the status
    #[arg(long, default_value_t = DEFAULT_TAIL_LINES)]
    pub log_lines: usize,

    /// Print the status as JSON and exit (no server)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print a text summary of the status and exit (no server)
    #[arg(long)]
    pub text: bool,
}

fn default_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        return Ok(dir);
    }
    std::env::current_dir().context("get current directory")
}

fn resolve_dir(home: &Path, dir: Option<&Path>) -> PathBuf {
    match dir {
        Some(d) if d.is_absolute() => d.to_path_buf(),
        Some(d) => home.join(d),
        None => home.to_path_buf(),
    }
}

/// Build a `DashboardConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<DashboardConfig> {
    let home = match args.home.as_deref() {
        Some(home) if home.is_absolute() => home.to_path_buf(),
        Some(home) => std::env::current_dir()
            .context("get current directory")?
            .join(home),
        None => default_home()?,
    };
    Ok(DashboardConfig {
        data_dir: resolve_dir(&home, args.data_dir.as_deref()),
        scripts_dir: resolve_dir(&home, args.scripts_dir.as_deref()),
        web_dir: resolve_dir(&home, args.web_dir.as_deref()),
        home,
        region: args.region.clone(),
        account_id: args.account_id.clone(),
        aws_bin: args.aws_bin.clone(),
        probe_timeout: Duration::from(args.probe_timeout),
        log_lines: args.log_lines,
    })
}

fn build_state(cfg: &DashboardConfig, utc_offset: UtcOffset) -> AppState {
    let supervisor = Supervisor::new(&cfg.scripts_dir, &cfg.data_dir);
    let aggregator = StatusAggregator::new(
        cfg.layout(),
        cfg.log_lines,
        Arc::new(AwsCliProbe::from_config(cfg)),
        supervisor.clone(),
    )
    .with_utc_offset(utc_offset);
    AppState {
        aggregator: Arc::new(aggregator),
        supervisor,
        web_dir: Arc::new(cfg.web_dir.clone()),
    }
}

/// `utc_offset` stamps snapshot timestamps; read it before the runtime starts.
pub async fn run(args: Cli, utc_offset: UtcOffset) -> Result<()> {
    let cfg = build_config(&args)?;
    if let Ok(resolved) = serde_json::to_string(&cfg) {
        tracing::debug!(config = %resolved, "resolved configuration");
    }

    if args.json || args.text {
        return run_once(&args, &cfg, utc_offset).await;
    }

    serve(&args, &cfg, utc_offset).await
}

async fn serve(args: &Cli, cfg: &DashboardConfig, utc_offset: UtcOffset) -> Result<()> {
    let app = api::create_router(build_state(cfg, utc_offset));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        data_dir = %cfg.data_dir.display(),
        scripts_dir = %cfg.scripts_dir.display(),
        web_dir = %cfg.web_dir.display(),
        "dashboard listening on http://{}",
        listener.local_addr()?
    );

    // Running scripts are detached; shutdown does not wait for them.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down");
}

/// Compute one snapshot and print it as JSON or text.
async fn run_once(args: &Cli, cfg: &DashboardConfig, utc_offset: UtcOffset) -> Result<()> {
    let state = build_state(cfg, utc_offset);
    let (out_tx, out_handle) = spawn_output_writer();

    let snapshot = state.aggregator.aggregate().await;
    if args.json {
        let out = serde_json::to_string_pretty(&snapshot)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = crate::text_summary::build_text_summary(&snapshot);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
        if snapshot.vaults.is_empty() && snapshot.jobs.is_empty() {
            let _ = out_tx.send(OutputLine::Stderr(format!(
                "No vault or job files found in {}",
                cfg.data_dir.display()
            )));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Cli {
        let mut argv = vec!["glacier-dashboard", "--home", "/srv/glacier"];
        argv.extend_from_slice(extra);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_put_everything_under_home() {
        let cfg = build_config(&parse(&[])).unwrap();
        assert_eq!(cfg.home, PathBuf::from("/srv/glacier"));
        assert_eq!(cfg.data_dir, cfg.home);
        assert_eq!(cfg.scripts_dir, cfg.home);
        assert_eq!(cfg.web_dir, cfg.home);
        assert_eq!(cfg.region, "eu-west-1");
        assert_eq!(cfg.probe_timeout, Duration::from_secs(10));
        assert_eq!(cfg.log_lines, 50);
        assert_eq!(cfg.layout().vault_list, PathBuf::from("/srv/glacier/glacier.json"));
    }

    #[test]
    fn relative_dirs_resolve_against_home() {
        let cfg = build_config(&parse(&[
            "--data-dir",
            "state",
            "--scripts-dir",
            "/opt/scripts",
            "--web-dir",
            "web",
            "--probe-timeout",
            "3s",
        ]))
        .unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/glacier/state"));
        assert_eq!(cfg.scripts_dir, PathBuf::from("/opt/scripts"));
        assert_eq!(cfg.web_dir, PathBuf::from("/srv/glacier/web"));
        assert_eq!(cfg.probe_timeout, Duration::from_secs(3));
        assert_eq!(
            cfg.layout().inventory_dir,
            PathBuf::from("/srv/glacier/state/glacier_inventory")
        );
    }

    #[test]
    fn json_and_text_are_exclusive() {
        let err = Cli::try_parse_from(["glacier-dashboard", "--json", "--text"]);
        assert!(err.is_err());
    }
}
