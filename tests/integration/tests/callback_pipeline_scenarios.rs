//! End-to-end scenarios over the public harness APIs, with the in-memory
//! store standing in for the shared backend and the scripted client double
//! standing in for the browser.

use std::sync::Arc;

use mira_core::{generate_session_id, HarnessConfig};
use mira_driver::{markers, NetworkConditions, PageDriver};
use mira_harness::doubles::ScriptedClientPage;
use mira_harness::injector::inject_burst;
use mira_harness::verifier::{await_delivery, await_processed, await_searching_state};
use mira_harness::{property_search_flow, FlowRunner, RunContext, SessionCleanup};
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
    config.delivery_fallback_timeout_ms = 500;
    config
}

fn harness() -> (MemoryCallbackStore, Arc<ScriptedClientPage>, RunContext) {
    let session_id = generate_session_id();
    let store = MemoryCallbackStore::new();
    let page = Arc::new(ScriptedClientPage::new(session_id.clone(), store.clone()));
    let ctx = RunContext::new(
        Arc::new(store.clone()),
        Arc::clone(&page) as Arc<dyn PageDriver>,
        session_id,
        fast_config(),
    );
    (store, page, ctx)
}

// Scenario: single iteration delivered and processed end to end.
#[tokio::test]
async fn integration_single_iteration_delivers_two_properties() {
    let (store, _page, ctx) = harness();
    let result = FlowRunner::new(ctx.clone())
        .run(&property_search_flow(), 1)
        .await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.completed_iterations, 1);
    let iteration = result.iteration_results().next().expect("iteration entry");
    assert_eq!(iteration.rendered_count, 2);
    assert!(iteration.callback_processed);

    // Backend agrees: the record exists and is no longer pending.
    let records = store.records_for_session(&ctx.session_id);
    assert_eq!(records.len(), 1);
    assert!(!records[0].pending);
}

// Scenario: run to the historically failure-prone second confirmation.
#[tokio::test]
async fn integration_second_iteration_completes_with_both_confirmations_logged() {
    let (_store, _page, ctx) = harness();
    let result = FlowRunner::new(ctx).run(&property_search_flow(), 2).await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.completed_iterations, 2);
    let steps: Vec<&str> = result.step_results().map(|s| s.step.as_str()).collect();
    assert!(steps.contains(&"SUMMARY_CONFIRMATION"));
    assert!(steps.contains(&"SECOND_CONFIRMATION"));
    assert!(result.step_results().all(|step| step.success));
}

// Scenario: the backend never writes the callback. The searching state is
// observed, delivery times out inside its deadline, and the client's polling
// fallback left its trace in the console.
#[tokio::test]
async fn integration_missing_callback_times_out_with_polling_fallback_active() {
    let (_store, page, ctx) = harness();

    page.click(markers::PRIMARY_OPTION_BUTTON).await.expect("open chat");
    page.fill(markers::CHAT_INPUT, "Sí, confirmo la búsqueda")
        .await
        .expect("fill");
    page.click(markers::SEND_BUTTON).await.expect("send");

    await_searching_state(&ctx).await.expect("searching state observed");

    let started = std::time::Instant::now();
    let outcome = await_delivery(&ctx, 300).await.expect("timeout is data");
    assert!(!outcome.delivered);
    assert!(started.elapsed().as_millis() < 2_000, "wait must stay bounded");

    let console = page.drain_console().await.expect("console");
    assert!(
        console.iter().any(|line| line.text.contains("polling")),
        "polling fallback should have logged activity"
    );
    // The loading state is still showing; nothing ever arrived.
    assert!(page
        .is_visible(markers::SEARCH_LOADING)
        .await
        .expect("visibility"));
}

// Multiple rapid callbacks: the harness only asserts that at least one of
// them was consumed.
#[tokio::test]
async fn integration_rapid_callback_burst_processes_at_least_one() {
    let (store, _page, ctx) = harness();
    let ids = inject_burst(&ctx, &[1, 2, 3]).await.expect("burst");
    assert_eq!(ids.len(), 3);

    let outcome = await_delivery(&ctx, 1_000).await.expect("delivery");
    assert!(outcome.delivered);

    let mut processed = 0;
    for id in ids {
        if await_processed(&ctx, id, 100).await.expect("poll") {
            processed += 1;
        }
    }
    assert!(processed >= 1, "at least one burst callback must be consumed");
}

// Degraded network: under slow 3g the pipeline still verifies; a full
// outage stalls delivery until conditions are restored.
#[tokio::test]
async fn integration_degraded_network_still_verifies_after_restore() {
    let (_store, page, ctx) = harness();

    page.emulate_network(&NetworkConditions::slow_3g())
        .await
        .expect("slow 3g");
    let result = FlowRunner::new(ctx.clone())
        .run(&property_search_flow(), 1)
        .await;
    assert!(result.success, "slow 3g errors: {:?}", result.errors);

    // Fresh page state; the first run already rendered its results.
    page.navigate(&ctx.config.base_url).await.expect("reload");
    page.emulate_network(&NetworkConditions::offline())
        .await
        .expect("offline");
    mira_harness::injector::inject(&ctx, 2).await.expect("inject while offline");
    let stalled = await_delivery(&ctx, 200).await.expect("bounded wait");
    assert!(!stalled.delivered);

    page.emulate_network(&NetworkConditions::restored())
        .await
        .expect("restore");
    let recovered = await_delivery(&ctx, 1_000).await.expect("delivery");
    assert!(recovered.delivered);
    assert_eq!(recovered.rendered_count, 2);
}

// Cleanup leaves the shared backend exactly as found, for this session.
#[tokio::test]
async fn integration_run_then_cleanup_leaves_no_session_rows() {
    let (store, _page, ctx) = harness();
    store.register_chat_session(&ctx.session_id);
    let cleanup = SessionCleanup::new(Arc::clone(&ctx.store), ctx.session_id.clone());

    let result = FlowRunner::new(ctx.clone())
        .run(&property_search_flow(), 3)
        .await;
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(store.records_for_session(&ctx.session_id).len(), 3);

    cleanup.run().await;
    assert!(store.records_for_session(&ctx.session_id).is_empty());
    assert!(!store.chat_session_exists(&ctx.session_id));
}
