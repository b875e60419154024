//! Mode execution: wires a storage backend and a page driver, runs the
//! requested scenario bundle per device project, and aggregates reports.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use mira_core::{generate_session_id, HarnessConfig};
use mira_driver::{PageDriver, PlaywrightCliPageDriver};
use mira_harness::devices::DeviceProfile;
use mira_harness::doubles::ScriptedClientPage;
use mira_harness::injector::inject_payload;
use mira_harness::verifier::await_delivery;
use mira_harness::{
    build_report, bulk_payload, property_search_flow, run_critical_iterations, FlowRunner,
    QaReport, RunContext, SessionCleanup,
};
use mira_storage::{CallbackStore, MemoryCallbackStore, RestCallbackStore};
use tracing::{info, warn};

use crate::args::{Cli, RunMode};

/// Where the run reads callbacks from and how it reaches the page.
enum Backend {
    /// No storage endpoint configured: dry run against the in-process client
    /// double, sharing one memory store.
    Memory(MemoryCallbackStore),
    /// Real storage plus the Playwright bridge CLI.
    Live { bridge_cli: String },
}

impl Backend {
    fn from_config(config: &HarnessConfig) -> Self {
        if config.storage_url.trim().is_empty() {
            warn!("no storage endpoint configured; running against the in-process client double");
            Backend::Memory(MemoryCallbackStore::new())
        } else {
            Backend::Live {
                bridge_cli: config.bridge_cli.clone(),
            }
        }
    }

    fn store(&self, config: &HarnessConfig) -> Result<Arc<dyn CallbackStore>> {
        match self {
            Backend::Memory(store) => Ok(Arc::new(store.clone())),
            Backend::Live { .. } => Ok(Arc::new(RestCallbackStore::new(config)?)),
        }
    }

    fn page(&self, session_id: &str) -> Result<Arc<dyn PageDriver>> {
        match self {
            Backend::Memory(store) => Ok(Arc::new(ScriptedClientPage::new(
                session_id,
                store.clone(),
            ))),
            Backend::Live { bridge_cli } => {
                if bridge_cli.trim().is_empty() {
                    bail!("a storage endpoint is configured but --bridge-cli is not set");
                }
                Ok(Arc::new(PlaywrightCliPageDriver::new(bridge_cli.clone())?))
            }
        }
    }
}

/// Runs the chosen mode and returns one report per executed run.
pub async fn run_mode(cli: &Cli, config: &HarnessConfig) -> Result<Vec<QaReport>> {
    let backend = Backend::from_config(config);
    match cli.mode {
        RunMode::Iterations => run_iterations(&backend, config).await,
        RunMode::Stress => run_stress(&backend, config).await,
        mode if cli.parallel => run_devices_parallel(mode, config).await,
        mode => run_devices_sequential(mode, &backend, config).await,
    }
}

async fn run_one(
    backend: &Backend,
    config: &HarnessConfig,
    device: &DeviceProfile,
    target_iteration: u32,
) -> Result<QaReport> {
    let session_id = generate_session_id();
    info!(device = %device.name, target_iteration, session_id = %session_id, "run starting");
    let store = backend.store(config)?;
    let page = backend.page(&session_id)?;
    let ctx = RunContext::new(Arc::clone(&store), page, session_id.clone(), config.clone());
    let cleanup = SessionCleanup::new(store, session_id);
    let result = FlowRunner::new(ctx)
        .run(&property_search_flow(), target_iteration)
        .await;
    cleanup.run().await;
    Ok(build_report(&result, &device.info()))
}

async fn run_devices_sequential(
    mode: RunMode,
    backend: &Backend,
    config: &HarnessConfig,
) -> Result<Vec<QaReport>> {
    let mut reports = Vec::new();
    for device in mode.device_projects() {
        reports.push(run_one(backend, config, &device, mode.target_iteration()).await?);
    }
    Ok(reports)
}

async fn run_devices_parallel(mode: RunMode, config: &HarnessConfig) -> Result<Vec<QaReport>> {
    let mut handles = Vec::new();
    for device in mode.device_projects() {
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            // Each parallel run owns its backend; sessions never share state.
            let backend = Backend::from_config(&config);
            run_one(&backend, &config, &device, mode.target_iteration()).await
        }));
    }
    let mut reports = Vec::new();
    for handle in handles {
        reports.push(handle.await.context("device run panicked")??);
    }
    Ok(reports)
}

async fn run_iterations(backend: &Backend, config: &HarnessConfig) -> Result<Vec<QaReport>> {
    let store = backend.store(config)?;
    let device = RunMode::Iterations.device_projects().remove(0);
    // Fail fast on a page that cannot be opened at all; a mid-sweep page
    // failure surfaces through the run result instead.
    backend.page("preflight")?;
    let mut page_error = None;
    let sweep = {
        let backend_page = |session_id: &str| -> Arc<dyn PageDriver> {
            match backend.page(session_id) {
                Ok(page) => page,
                Err(error) => {
                    page_error.get_or_insert(error.to_string());
                    Arc::new(ScriptedClientPage::new(session_id, MemoryCallbackStore::new()))
                }
            }
        };
        run_critical_iterations(store, config.clone(), backend_page).await
    };
    if let Some(detail) = page_error {
        bail!("failed to open a page for the critical-iterations sweep: {detail}");
    }
    Ok(sweep
        .runs
        .into_iter()
        .map(|run| build_report(&run.result, &device.info()))
        .collect())
}

/// Full flow, then one oversized callback on top of the same session style.
async fn run_stress(backend: &Backend, config: &HarnessConfig) -> Result<Vec<QaReport>> {
    let device = RunMode::Stress.device_projects().remove(0);
    let mut report = run_one(backend, config, &device, 3).await?;

    let session_id = generate_session_id();
    let store = backend.store(config)?;
    let page = backend.page(&session_id)?;
    let ctx = RunContext::new(Arc::clone(&store), page, session_id.clone(), config.clone());
    let cleanup = SessionCleanup::new(store, session_id);

    let payload = bulk_payload(50);
    let bulk_outcome = match inject_payload(&ctx, &payload).await {
        Ok(_) => await_delivery(&ctx, config.delivery_fallback_timeout_ms)
            .await
            .map_err(anyhow::Error::from)
            .map(|outcome| outcome.delivered && outcome.rendered_count == payload.property_count()),
        Err(failure) => Err(failure.into()),
    };
    cleanup.run().await;

    match bulk_outcome {
        Ok(true) => info!("bulk callback delivered and fully rendered"),
        Ok(false) => {
            report.summary.success = false;
            report
                .errors
                .push("bulk callback was not fully rendered within the deadline".to_string());
        }
        Err(error) => {
            report.summary.success = false;
            report.errors.push(format!("bulk callback failed: {error}"));
        }
    }
    Ok(vec![report])
}

/// Prints the per-run summary table the suite ends with.
pub fn print_summary(reports: &[QaReport]) {
    println!("\n{:<24} {:<8} {:>10} {:>12}", "project", "result", "iterations", "elapsed");
    for report in reports {
        println!(
            "{:<24} {:<8} {:>7}/{:<2} {:>10}ms",
            report.device.name,
            if report.summary.success { "pass" } else { "FAIL" },
            report.summary.completed_iterations,
            report.summary.target_iteration,
            report.summary.total_elapsed_ms
        );
    }
    let failed = reports.iter().filter(|r| !r.summary.success).count();
    println!(
        "\n{} run(s), {} failed",
        reports.len(),
        failed
    );
}
