//! Pipeline invariants exercised end to end: progress monotonicity, exact
//! rendered counts, session isolation, idempotent cleanup, and bounded
//! timeout behavior.

use std::sync::Arc;

use mira_core::{generate_session_id, is_harness_session_id, HarnessConfig};
use mira_driver::PageDriver;
use mira_harness::doubles::ScriptedClientPage;
use mira_harness::verifier::await_delivery;
use mira_harness::{property_search_flow, FlowRunner, RunContext, RunLogEntry, SessionCleanup};
use mira_storage::MemoryCallbackStore;

fn fast_config() -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.step_delay_ms = 10;
    config.page_load_timeout_ms = 500;
    config.response_timeout_ms = 500;
    config.searching_state_timeout_ms = 300;
    config.callback_timeout_ms = 1_000;
    config.processed_timeout_ms = 500;
    config.processed_poll_interval_ms = 20;
    config
}

fn harness_on(store: &MemoryCallbackStore) -> (Arc<ScriptedClientPage>, RunContext) {
    let session_id = generate_session_id();
    assert!(is_harness_session_id(&session_id));
    let page = Arc::new(ScriptedClientPage::new(session_id.clone(), store.clone()));
    let ctx = RunContext::new(
        Arc::new(store.clone()),
        Arc::clone(&page) as Arc<dyn PageDriver>,
        session_id,
        fast_config(),
    );
    (page, ctx)
}

// Completed iterations only ever grow, in order, with no gaps.
#[tokio::test]
async fn integration_iteration_progress_is_monotonic_and_gap_free() {
    let store = MemoryCallbackStore::new();
    let (_page, ctx) = harness_on(&store);
    let result = FlowRunner::new(ctx).run(&property_search_flow(), 3).await;

    assert!(result.success, "errors: {:?}", result.errors);
    let iterations: Vec<u32> = result
        .iteration_results()
        .map(|iteration| iteration.iteration)
        .collect();
    assert_eq!(iterations, vec![1, 2, 3]);
    assert_eq!(result.completed_iterations, 3);
}

// The UI renders exactly as many cards as the payload carried.
#[tokio::test]
async fn integration_rendered_counts_match_payload_sizes_exactly() {
    let store = MemoryCallbackStore::new();
    let (_page, ctx) = harness_on(&store);
    let result = FlowRunner::new(ctx).run(&property_search_flow(), 3).await;

    assert!(result.success, "errors: {:?}", result.errors);
    for iteration in result.iteration_results() {
        let expected = mira_harness::payload_for_iteration(iteration.iteration)
            .expect("scripted payload")
            .property_count();
        assert_eq!(iteration.rendered_count, expected);
    }
}

// Two concurrent sessions never observe each other's callbacks.
#[tokio::test]
async fn integration_concurrent_sessions_stay_isolated() {
    let store = MemoryCallbackStore::new();
    let (_page_a, ctx_a) = harness_on(&store);
    let (_page_b, ctx_b) = harness_on(&store);
    assert_ne!(ctx_a.session_id, ctx_b.session_id);

    let runner_a = FlowRunner::new(ctx_a.clone());
    let runner_b = FlowRunner::new(ctx_b.clone());
    let flow = property_search_flow();
    let (result_a, result_b) = tokio::join!(runner_a.run(&flow, 2), runner_b.run(&flow, 1));

    assert!(result_a.success, "a errors: {:?}", result_a.errors);
    assert!(result_b.success, "b errors: {:?}", result_b.errors);
    assert_eq!(store.records_for_session(&ctx_a.session_id).len(), 2);
    assert_eq!(store.records_for_session(&ctx_b.session_id).len(), 1);
    for record in store.records_for_session(&ctx_b.session_id) {
        assert_eq!(record.session_id, ctx_b.session_id);
    }
}

// Running cleanup twice is as good as running it once.
#[tokio::test]
async fn integration_double_cleanup_is_idempotent() {
    let store = MemoryCallbackStore::new();
    let (_page, ctx) = harness_on(&store);
    store.register_chat_session(&ctx.session_id);
    FlowRunner::new(ctx.clone())
        .run(&property_search_flow(), 1)
        .await;

    let cleanup = SessionCleanup::new(Arc::clone(&ctx.store), ctx.session_id.clone());
    cleanup.run().await;
    cleanup.run().await;
    let again = SessionCleanup::new(Arc::clone(&ctx.store), ctx.session_id.clone());
    again.run().await;

    assert!(store.records_for_session(&ctx.session_id).is_empty());
    assert!(!store.chat_session_exists(&ctx.session_id));
}

// When nothing is ever delivered, the run still terminates inside its
// deadlines and reports the timeout instead of hanging.
#[tokio::test]
async fn integration_undelivered_callback_terminates_within_deadline() {
    let store = MemoryCallbackStore::new();
    let (page, ctx) = harness_on(&store);
    page.suppress_delivery();

    let started = std::time::Instant::now();
    let result = FlowRunner::new(ctx).run(&property_search_flow(), 1).await;
    let elapsed = started.elapsed();

    assert!(!result.success);
    assert_eq!(result.completed_iterations, 0);
    assert!(
        result.errors.iter().any(|error| error.contains("not rendered")),
        "errors: {:?}",
        result.errors
    );
    // Deadlines in fast_config sum to well under ten seconds.
    assert!(elapsed.as_secs() < 10, "run must not hang: {elapsed:?}");

    // The iteration entry still records what was observable.
    let iteration = match result.entries.iter().find(|entry| {
        matches!(entry, RunLogEntry::Iteration(_))
    }) {
        Some(RunLogEntry::Iteration(iteration)) => iteration,
        _ => panic!("iteration entry missing"),
    };
    assert!(iteration.callback_received);
    assert!(!iteration.ui_updated);
}

// A direct bounded wait with no injection at all returns, not hangs.
#[tokio::test]
async fn integration_empty_store_delivery_wait_is_bounded() {
    let store = MemoryCallbackStore::new();
    let (_page, ctx) = harness_on(&store);
    let started = std::time::Instant::now();
    let outcome = await_delivery(&ctx, 200).await.expect("bounded wait");
    assert!(!outcome.delivered);
    assert!(started.elapsed().as_millis() >= 200);
    assert!(started.elapsed().as_millis() < 1_000);
}
