//! Delivery verification: observes the UI side of the callback pipeline and
//! polls the backend pending flag, each wait bounded by a config deadline.

use std::time::Duration;

use mira_core::{current_unix_timestamp_ms, HarnessFailure};
use mira_driver::{markers, SelectorState};
use mira_storage::CallbackRecordId;
use tracing::{debug, info};

use crate::context::RunContext;

/// What the UI showed within the delivery deadline. A timeout is data, not an
/// error: `delivered` is simply false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub delivered: bool,
    pub rendered_count: usize,
    pub elapsed_ms: u64,
}

/// Waits for the searching indicator and its message to appear after a
/// confirmation was sent. Its absence means the callback pipeline was never
/// armed, which is fatal.
pub async fn await_searching_state(ctx: &RunContext) -> Result<(), HarnessFailure> {
    let timeout_ms = ctx.config.searching_state_timeout_ms;
    match ctx
        .page
        .wait_for_selector(markers::SEARCH_LOADING, SelectorState::Visible, timeout_ms)
        .await
    {
        Ok(()) => {}
        Err(error) if error.is_timeout() => {
            return Err(HarnessFailure::SearchStateNotObserved { timeout_ms });
        }
        Err(error) => {
            return Err(HarnessFailure::Driver {
                detail: error.to_string(),
            });
        }
    }
    let text = ctx
        .page
        .text_content(markers::SEARCH_LOADING_TEXT)
        .await
        .map_err(|error| HarnessFailure::Driver {
            detail: error.to_string(),
        })?;
    debug!(message = %text, "searching state observed");
    Ok(())
}

/// Single bounded wait for the properties container, then a thumbnail count.
/// Ok with `delivered: false` when the deadline passes; Err only on transport
/// failure.
pub async fn await_delivery(
    ctx: &RunContext,
    deadline_ms: u64,
) -> Result<DeliveryOutcome, HarnessFailure> {
    let started = current_unix_timestamp_ms();
    match ctx
        .page
        .wait_for_selector(markers::PROPERTIES_CONTAINER, SelectorState::Visible, deadline_ms)
        .await
    {
        Ok(()) => {}
        Err(error) if error.is_timeout() => {
            return Ok(DeliveryOutcome {
                delivered: false,
                rendered_count: 0,
                elapsed_ms: current_unix_timestamp_ms().saturating_sub(started),
            });
        }
        Err(error) => {
            return Err(HarnessFailure::Driver {
                detail: error.to_string(),
            });
        }
    }
    let rendered_count = ctx
        .page
        .count(markers::PROPERTY_THUMBNAIL)
        .await
        .map_err(|error| HarnessFailure::Driver {
            detail: error.to_string(),
        })?;
    let elapsed_ms = current_unix_timestamp_ms().saturating_sub(started);
    info!(rendered_count, elapsed_ms, "callback delivered to the UI");
    Ok(DeliveryOutcome {
        delivered: true,
        rendered_count,
        elapsed_ms,
    })
}

/// Polls the backend pending flag until it flips or the deadline passes.
/// Independent of UI delivery; read failures propagate as `StorageRead`.
pub async fn await_processed(
    ctx: &RunContext,
    record_id: CallbackRecordId,
    timeout_ms: u64,
) -> Result<bool, HarnessFailure> {
    let deadline = current_unix_timestamp_ms() + timeout_ms;
    loop {
        if !ctx.store.callback_pending(record_id).await? {
            return Ok(true);
        }
        if current_unix_timestamp_ms() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(Duration::from_millis(ctx.config.processed_poll_interval_ms)).await;
    }
}

/// Waits for the searching indicator to clear after delivery.
pub async fn await_loading_cleared(ctx: &RunContext, timeout_ms: u64) -> Result<(), HarnessFailure> {
    ctx.page
        .wait_for_selector(markers::SEARCH_LOADING, SelectorState::Hidden, timeout_ms)
        .await
        .map_err(|error| HarnessFailure::Driver {
            detail: error.to_string(),
        })
}
