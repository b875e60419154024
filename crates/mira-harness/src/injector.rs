//! Writes fabricated callback rows into the shared store, standing in for the
//! production search backend.

use mira_core::HarnessFailure;
use mira_storage::{CallbackPayload, CallbackRecordId};
use tracing::info;

use crate::context::RunContext;
use crate::payloads::payload_for_iteration;

/// Inserts the canonical payload for `iteration`. Exactly one insert, no
/// retries; a write failure is fatal for the iteration.
pub async fn inject(ctx: &RunContext, iteration: u32) -> Result<CallbackRecordId, HarnessFailure> {
    let payload = payload_for_iteration(iteration).ok_or_else(|| HarnessFailure::StorageWrite {
        detail: format!("no scripted payload for iteration {iteration}"),
    })?;
    inject_payload(ctx, &payload).await
}

/// Inserts an arbitrary payload for the run's session after validating it.
pub async fn inject_payload(
    ctx: &RunContext,
    payload: &CallbackPayload,
) -> Result<CallbackRecordId, HarnessFailure> {
    payload
        .validate()
        .map_err(|error| HarnessFailure::StorageWrite {
            detail: format!("refusing to inject invalid payload: {error}"),
        })?;
    let record_id = ctx
        .store
        .insert_callback(&ctx.session_id, payload)
        .await?;
    info!(
        session_id = %ctx.session_id,
        record_id,
        properties = payload.property_count(),
        "callback injected"
    );
    Ok(record_id)
}

/// Back-to-back inserts with no pacing, for the rapid-callbacks scenario.
/// Stops at the first write failure.
pub async fn inject_burst(
    ctx: &RunContext,
    iterations: &[u32],
) -> Result<Vec<CallbackRecordId>, HarnessFailure> {
    let mut ids = Vec::with_capacity(iterations.len());
    for &iteration in iterations {
        ids.push(inject(ctx, iteration).await?);
    }
    Ok(ids)
}
