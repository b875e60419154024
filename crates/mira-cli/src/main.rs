mod args;
mod runner;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use mira_core::HarnessConfig;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::args::Cli;
use crate::runner::{print_summary, run_mode};

const RESULTS_DIR: &str = "test-results";
const REPORTS_DIR: &str = "qa-reports";

fn init_tracing(debug: bool) {
    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tokio::select! {
        outcome = run(&cli) => match outcome {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::from(1),
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, shutting down");
            ExitCode::from(130)
        }
    }
}

async fn run(cli: &Cli) -> Result<bool> {
    let mut config = HarnessConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(bridge_cli) = &cli.bridge_cli {
        config.bridge_cli = bridge_cli.clone();
    }
    if cli.headed {
        // The bridge CLI picks this up when launching the browser.
        std::env::set_var("MIRA_BRIDGE_HEADED", "1");
    }
    bootstrap_dirs()?;

    info!(mode = cli.mode.label(), base_url = %config.base_url, "qa suite starting");
    let reports = run_mode(cli, &config).await?;
    print_summary(&reports);

    if cli.report {
        let path = write_report(Path::new(REPORTS_DIR), &reports)?;
        info!(path = %path.display(), "aggregated report written");
    }

    Ok(reports.iter().all(|report| report.summary.success))
}

fn bootstrap_dirs() -> Result<()> {
    for dir in [RESULTS_DIR, REPORTS_DIR] {
        std::fs::create_dir_all(dir).with_context(|| format!("failed to create {dir}/"))?;
    }
    Ok(())
}

fn write_report(dir: &Path, reports: &[mira_harness::QaReport]) -> Result<std::path::PathBuf> {
    let path = dir.join(format!(
        "qa-report-{}.json",
        Utc::now().format("%Y%m%d-%H%M%S")
    ));
    let body = serde_json::to_string_pretty(reports).context("failed to serialize report")?;
    std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
