//! End-to-end QA harness for the chat-based property-search application.
//!
//! The harness drives the scripted conversation through a [`mira_driver::PageDriver`],
//! fabricates search-result callbacks directly into the shared store through a
//! [`mira_storage::CallbackStore`], and verifies that each callback reaches the
//! UI and is marked processed within its deadlines. [`orchestrator::FlowRunner`]
//! owns the run state machine and always returns a [`results::FlowRunResult`].

pub mod cleanup;
pub mod context;
pub mod conversation;
pub mod devices;
pub mod doubles;
pub mod flow;
pub mod injector;
pub mod orchestrator;
pub mod payloads;
pub mod report;
pub mod results;
pub mod verifier;

pub use cleanup::SessionCleanup;
pub use context::RunContext;
pub use devices::{device_catalogue, DeviceInfo, DeviceProfile};
pub use flow::{property_search_flow, ConversationFlow, ConversationStep};
pub use orchestrator::{run_critical_iterations, CriticalSweep, FlowRunner};
pub use payloads::{bulk_payload, payload_for_iteration};
pub use report::{build_report, QaReport};
pub use results::{FlowRunResult, IterationResult, RunLogEntry, StepResult};
pub use verifier::DeliveryOutcome;
