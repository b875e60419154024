//! Iteration orchestrator: drives the scripted conversation, arms and
//! verifies each callback iteration, and folds every child failure into one
//! `FlowRunResult`. Nothing panics past this boundary.

use std::sync::Arc;
use std::time::Duration;

use mira_core::{
    current_unix_timestamp_ms, generate_session_id, HarnessConfig, HarnessFailure,
};
use mira_driver::{markers, PageDriver, SelectorState};
use mira_storage::CallbackStore;
use tracing::{debug, info};

use crate::cleanup::SessionCleanup;
use crate::context::RunContext;
use crate::conversation::execute_step;
use crate::flow::{property_search_flow, ConversationFlow};
use crate::injector::inject;
use crate::payloads::payload_for_iteration;
use crate::results::{FlowRunResult, IterationResult, RunLogEntry};
use crate::verifier::{await_delivery, await_loading_cleared, await_processed, await_searching_state};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    AdvancingFlow,
    AwaitingCallback(u32),
    VerifyingIteration(u32),
    Completed,
    Aborted,
}

/// Runs a [`ConversationFlow`] up to a target iteration.
pub struct FlowRunner {
    ctx: RunContext,
}

impl FlowRunner {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn session_id(&self) -> &str {
        &self.ctx.session_id
    }

    /// Executes the flow until `target_iteration` verifies, a failure aborts
    /// the run, or the steps are exhausted. Steps past the target's
    /// triggering step are never executed, and nothing runs after the first
    /// failed step or iteration.
    pub async fn run(&self, flow: &ConversationFlow, target_iteration: u32) -> FlowRunResult {
        let started = current_unix_timestamp_ms();
        let mut entries = Vec::new();
        let mut errors = Vec::new();
        let mut completed_iterations = 0u32;
        let mut state = RunState::AdvancingFlow;

        if target_iteration > flow.max_iteration() {
            errors.push(format!(
                "target iteration {target_iteration} exceeds flow maximum {}",
                flow.max_iteration()
            ));
            state = RunState::Aborted;
        }

        if state == RunState::AdvancingFlow {
            if let Err(failure) = self.open_chat().await {
                errors.push(failure.to_string());
                state = RunState::Aborted;
            }
        }

        if state == RunState::AdvancingFlow {
            for (index, step) in flow.steps().iter().enumerate() {
                if let Some(trigger) = step.trigger {
                    if trigger.iteration > target_iteration {
                        break;
                    }
                }
                if index > 0 {
                    tokio::time::sleep(Duration::from_millis(self.ctx.config.step_delay_ms)).await;
                }

                let step_result = execute_step(&self.ctx, step).await;
                let step_ok = step_result.success;
                let step_error = step_result.error.clone();
                entries.push(RunLogEntry::Step(step_result));
                if !step_ok {
                    errors.push(step_error.unwrap_or_else(|| format!("step {} failed", step.name)));
                    state = RunState::Aborted;
                    break;
                }

                let Some(trigger) = step.trigger else {
                    continue;
                };
                state = RunState::AwaitingCallback(trigger.iteration);
                debug!(state = ?state, "entering callback phase");
                let iteration_result = self.run_iteration(trigger.iteration, &mut state).await;
                let iteration_ok = iteration_result.success;
                let iteration_error = iteration_result.error.clone();
                entries.push(RunLogEntry::Iteration(iteration_result));

                if iteration_ok {
                    completed_iterations = trigger.iteration;
                    info!(iteration = trigger.iteration, "iteration verified");
                    if trigger.iteration == target_iteration {
                        state = RunState::Completed;
                        break;
                    }
                    state = RunState::AdvancingFlow;
                } else {
                    // First failed iteration ends the run; later steps would
                    // inject callbacks into an already-broken session.
                    errors.push(
                        iteration_error
                            .unwrap_or_else(|| format!("iteration {} failed", trigger.iteration)),
                    );
                    state = RunState::Aborted;
                    break;
                }
            }
        }

        if state == RunState::AdvancingFlow {
            state = if completed_iterations == target_iteration {
                RunState::Completed
            } else {
                RunState::Aborted
            };
        }

        FlowRunResult {
            session_id: self.ctx.session_id.clone(),
            target_iteration,
            completed_iterations,
            entries,
            total_elapsed_ms: current_unix_timestamp_ms().saturating_sub(started),
            success: state == RunState::Completed && errors.is_empty(),
            errors,
        }
    }

    /// Navigates to the application and moves from the welcome screen into
    /// the chat screen.
    async fn open_chat(&self) -> Result<(), HarnessFailure> {
        let page = self.ctx.page.as_ref();
        let timeout_ms = self.ctx.config.page_load_timeout_ms;
        let driver_failure = |error: mira_driver::DriverError| HarnessFailure::Driver {
            detail: error.to_string(),
        };

        page.navigate(&self.ctx.config.base_url)
            .await
            .map_err(driver_failure)?;
        page.wait_for_selector(markers::WELCOME_SCREEN, SelectorState::Visible, timeout_ms)
            .await
            .map_err(driver_failure)?;
        page.click(markers::PRIMARY_OPTION_BUTTON)
            .await
            .map_err(driver_failure)?;
        page.wait_for_selector(markers::CHAT_SCREEN, SelectorState::Visible, timeout_ms)
            .await
            .map_err(driver_failure)?;
        debug!(session_id = %self.ctx.session_id, "chat screen reached");
        Ok(())
    }

    /// One iteration: observe the searching state, inject the canonical
    /// payload, then verify UI delivery, the pending flag, and the rendered
    /// count.
    async fn run_iteration(&self, iteration: u32, state: &mut RunState) -> IterationResult {
        let started = current_unix_timestamp_ms();
        let mut result = IterationResult::pending(iteration);
        let finish = |mut result: IterationResult, started: u64| {
            result.elapsed_ms = current_unix_timestamp_ms().saturating_sub(started);
            result
        };

        if let Err(failure) = await_searching_state(&self.ctx).await {
            result.error = Some(failure.to_string());
            return finish(result, started);
        }

        let record_id = match inject(&self.ctx, iteration).await {
            Ok(id) => id,
            Err(failure) => {
                result.error = Some(failure.to_string());
                return finish(result, started);
            }
        };
        result.callback_received = true;
        result.callback_id = Some(record_id);

        *state = RunState::VerifyingIteration(iteration);
        debug!(state = ?state, "entering verification phase");

        let deadline_ms = self.ctx.config.callback_timeout_ms;
        let outcome = match await_delivery(&self.ctx, deadline_ms).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                result.error = Some(failure.to_string());
                return finish(result, started);
            }
        };
        result.ui_updated = outcome.delivered;
        result.rendered_count = outcome.rendered_count;

        // The pending flag is checked even when the UI never rendered;
        // realtime consumption and rendering are independent failures.
        let processed =
            match await_processed(&self.ctx, record_id, self.ctx.config.processed_timeout_ms).await {
                Ok(processed) => processed,
                Err(failure) => {
                    result.error = Some(failure.to_string());
                    return finish(result, started);
                }
            };
        result.callback_processed = processed;

        if !outcome.delivered {
            let failure = HarnessFailure::DeliveryTimeout { deadline_ms };
            result.error = Some(failure.to_string());
            return finish(result, started);
        }
        if !processed {
            let failure = HarnessFailure::ProcessedFlagTimeout {
                record_id,
                timeout_ms: self.ctx.config.processed_timeout_ms,
            };
            result.error = Some(failure.to_string());
            return finish(result, started);
        }

        let expected_count = payload_for_iteration(iteration)
            .map(|payload| payload.property_count())
            .unwrap_or(outcome.rendered_count);
        if outcome.rendered_count != expected_count {
            result.error = Some(format!(
                "iteration {iteration} rendered {} properties where {expected_count} were expected",
                outcome.rendered_count
            ));
            return finish(result, started);
        }

        if let Err(error) =
            await_loading_cleared(&self.ctx, self.ctx.config.searching_state_timeout_ms).await
        {
            debug!(%error, "loading indicator still visible after delivery");
        }

        result.success = true;
        finish(result, started)
    }
}

/// Outcome of one target in the critical-iterations sweep.
#[derive(Debug, Clone)]
pub struct CriticalIterationOutcome {
    pub target: u32,
    pub result: FlowRunResult,
}

#[derive(Debug, Clone)]
pub struct CriticalSweep {
    pub runs: Vec<CriticalIterationOutcome>,
    pub all_passed: bool,
}

/// Runs the canonical flow against the historically failure-prone targets
/// (2, then 3) back to back, each in a fresh session and a fresh page, with
/// cleanup between.
pub async fn run_critical_iterations<F>(
    store: Arc<dyn CallbackStore>,
    config: HarnessConfig,
    mut page_for_session: F,
) -> CriticalSweep
where
    F: FnMut(&str) -> Arc<dyn PageDriver>,
{
    let flow = property_search_flow();
    let mut runs = Vec::new();
    for target in [2u32, 3] {
        let session_id = generate_session_id();
        info!(target, session_id = %session_id, "critical iteration run starting");
        let page = page_for_session(&session_id);
        let ctx = RunContext::new(
            Arc::clone(&store),
            page,
            session_id.clone(),
            config.clone(),
        );
        let cleanup = SessionCleanup::new(Arc::clone(&store), session_id);
        let result = FlowRunner::new(ctx).run(&flow, target).await;
        cleanup.run().await;
        runs.push(CriticalIterationOutcome { target, result });
    }
    let all_passed = runs.iter().all(|run| run.result.success);
    CriticalSweep { runs, all_passed }
}
