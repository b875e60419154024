use mira_core::HarnessFailure;
use mira_storage::CallbackRecordId;
use serde::{Deserialize, Serialize};

/// Outcome of one conversational step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub success: bool,
    pub elapsed_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub failure: Option<HarnessFailure>,
}

/// Outcome of one callback iteration. Overall success requires all three
/// independent checks: record received by storage, UI rendered it, and the
/// backend pending flag flipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    pub iteration: u32,
    pub success: bool,
    pub callback_received: bool,
    pub ui_updated: bool,
    pub callback_processed: bool,
    pub rendered_count: usize,
    pub elapsed_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub callback_id: Option<CallbackRecordId>,
}

impl IterationResult {
    pub fn pending(iteration: u32) -> Self {
        Self {
            iteration,
            success: false,
            callback_received: false,
            ui_updated: false,
            callback_processed: false,
            rendered_count: 0,
            elapsed_ms: 0,
            error: None,
            callback_id: None,
        }
    }
}

/// One entry in the ordered run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum RunLogEntry {
    Step(StepResult),
    Iteration(IterationResult),
}

impl RunLogEntry {
    pub fn succeeded(&self) -> bool {
        match self {
            Self::Step(step) => step.success,
            Self::Iteration(iteration) => iteration.success,
        }
    }
}

/// Aggregate result of one orchestrated flow run. Always produced; the
/// orchestrator never lets an error escape its boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRunResult {
    pub session_id: String,
    pub target_iteration: u32,
    pub completed_iterations: u32,
    pub entries: Vec<RunLogEntry>,
    pub total_elapsed_ms: u64,
    pub success: bool,
    pub errors: Vec<String>,
}

impl FlowRunResult {
    pub fn step_results(&self) -> impl Iterator<Item = &StepResult> {
        self.entries.iter().filter_map(|entry| match entry {
            RunLogEntry::Step(step) => Some(step),
            RunLogEntry::Iteration(_) => None,
        })
    }

    pub fn iteration_results(&self) -> impl Iterator<Item = &IterationResult> {
        self.entries.iter().filter_map(|entry| match entry {
            RunLogEntry::Iteration(iteration) => Some(iteration),
            RunLogEntry::Step(_) => None,
        })
    }

    /// Iteration numbers that were attempted but did not verify.
    pub fn failed_iterations(&self) -> Vec<u32> {
        self.iteration_results()
            .filter(|result| !result.success)
            .map(|result| result.iteration)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{FlowRunResult, IterationResult, RunLogEntry, StepResult};

    fn sample_run() -> FlowRunResult {
        FlowRunResult {
            session_id: "qa_test_1_abc".to_string(),
            target_iteration: 2,
            completed_iterations: 1,
            entries: vec![
                RunLogEntry::Step(StepResult {
                    step: "INITIAL_SEARCH".to_string(),
                    success: true,
                    elapsed_ms: 1_200,
                    error: None,
                    failure: None,
                }),
                RunLogEntry::Iteration(IterationResult {
                    success: true,
                    callback_received: true,
                    ui_updated: true,
                    callback_processed: true,
                    rendered_count: 2,
                    elapsed_ms: 6_000,
                    ..IterationResult::pending(1)
                }),
                RunLogEntry::Iteration(IterationResult {
                    error: Some("callback not rendered".to_string()),
                    ..IterationResult::pending(2)
                }),
            ],
            total_elapsed_ms: 9_000,
            success: false,
            errors: vec!["iteration 2 failed".to_string()],
        }
    }

    #[test]
    fn unit_accessors_partition_entries_by_kind() {
        let run = sample_run();
        assert_eq!(run.step_results().count(), 1);
        assert_eq!(run.iteration_results().count(), 2);
        assert_eq!(run.failed_iterations(), vec![2]);
    }

    #[test]
    fn unit_run_log_round_trips_through_json() {
        let run = sample_run();
        let encoded = serde_json::to_string(&run).expect("serialize");
        let decoded: FlowRunResult = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, run);
    }
}
