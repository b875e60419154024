use mira_core::{current_unix_timestamp_ms, HarnessFailure};
use mira_driver::{markers, SelectorState};
use tracing::debug;

use crate::context::RunContext;
use crate::flow::ConversationStep;
use crate::results::StepResult;

/// Executes one scripted conversational step against the live UI: submits the
/// user utterance, waits (bounded) for the assistant's reply, and checks the
/// reply contains the expected substring case-insensitively.
///
/// Mutates live conversation state only; nothing is persisted. Elapsed time
/// is recorded on every outcome.
pub async fn execute_step(ctx: &RunContext, step: &ConversationStep) -> StepResult {
    let started = current_unix_timestamp_ms();
    let failure = run_step_body(ctx, step).await.err();
    let elapsed_ms = current_unix_timestamp_ms().saturating_sub(started);
    match failure {
        None => {
            debug!(step = %step.name, elapsed_ms, "conversation step succeeded");
            StepResult {
                step: step.name.clone(),
                success: true,
                elapsed_ms,
                error: None,
                failure: None,
            }
        }
        Some(failure) => StepResult {
            step: step.name.clone(),
            success: false,
            elapsed_ms,
            error: Some(failure.to_string()),
            failure: Some(failure),
        },
    }
}

async fn run_step_body(ctx: &RunContext, step: &ConversationStep) -> Result<(), HarnessFailure> {
    let page = ctx.page.as_ref();
    let timeout_ms = ctx.config.response_timeout_ms;

    page.fill(markers::CHAT_INPUT, &step.user_message)
        .await
        .map_err(|error| HarnessFailure::Driver {
            detail: error.to_string(),
        })?;
    page.click(markers::SEND_BUTTON)
        .await
        .map_err(|error| HarnessFailure::Driver {
            detail: error.to_string(),
        })?;

    match page
        .wait_for_selector(markers::LAST_ASSISTANT_MESSAGE, SelectorState::Visible, timeout_ms)
        .await
    {
        Ok(()) => {}
        Err(error) if error.is_timeout() => {
            return Err(HarnessFailure::StepTimeout {
                step: step.name.clone(),
                timeout_ms,
            });
        }
        Err(error) => {
            return Err(HarnessFailure::Driver {
                detail: error.to_string(),
            });
        }
    }

    let reply = page
        .text_content(markers::LAST_ASSISTANT_MESSAGE)
        .await
        .map_err(|error| HarnessFailure::Driver {
            detail: error.to_string(),
        })?;
    if reply
        .to_lowercase()
        .contains(&step.expected_response.to_lowercase())
    {
        Ok(())
    } else {
        Err(HarnessFailure::UnexpectedResponse {
            step: step.name.clone(),
            expected: step.expected_response.clone(),
            actual: reply,
        })
    }
}
