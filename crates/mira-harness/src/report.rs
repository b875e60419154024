//! Report generation: a pure projection of a finished run into a
//! serializable document with advisory recommendations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::devices::DeviceInfo;
use crate::results::{FlowRunResult, RunLogEntry};

/// Total run time above which the report flags performance degradation.
const SLOW_RUN_THRESHOLD_MS: u64 = 120_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub session_id: String,
    pub target_iteration: u32,
    pub completed_iterations: u32,
    pub success: bool,
    pub total_elapsed_ms: u64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaReport {
    pub summary: ReportSummary,
    pub device: DeviceInfo,
    pub entries: Vec<RunLogEntry>,
    pub errors: Vec<String>,
    /// Advisory only; never consulted by control flow.
    pub recommendations: Vec<String>,
}

/// Builds the report for one finished run. Pure apart from the timestamp.
pub fn build_report(run: &FlowRunResult, device: &DeviceInfo) -> QaReport {
    QaReport {
        summary: ReportSummary {
            session_id: run.session_id.clone(),
            target_iteration: run.target_iteration,
            completed_iterations: run.completed_iterations,
            success: run.success,
            total_elapsed_ms: run.total_elapsed_ms,
            generated_at: Utc::now(),
        },
        device: device.clone(),
        entries: run.entries.clone(),
        errors: run.errors.clone(),
        recommendations: recommendations_for(run),
    }
}

fn recommendations_for(run: &FlowRunResult) -> Vec<String> {
    let mut recommendations = Vec::new();
    if !run.success {
        recommendations.push(
            "CRITICAL: the callback pipeline did not verify end to end; fix before release"
                .to_string(),
        );
    }
    if !run.errors.is_empty() {
        recommendations.push(format!(
            "Review the {} recorded error(s) against application and storage logs",
            run.errors.len()
        ));
    }
    let failed = run.failed_iterations();
    if !failed.is_empty() {
        let numbers = failed
            .iter()
            .map(|iteration| iteration.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        recommendations.push(format!(
            "Iterations [{numbers}] failed verification; inspect realtime push and polling fallback for those confirmations"
        ));
    }
    if run.total_elapsed_ms > SLOW_RUN_THRESHOLD_MS {
        recommendations.push(format!(
            "Run took {}ms; investigate performance degradation in delivery latency",
            run.total_elapsed_ms
        ));
    }
    recommendations
}
