use serde::{Deserialize, Serialize};

/// Typed failure taxonomy for harness outcomes.
///
/// Component-level functions return these inside outcome objects whenever the
/// failure is an expected branch (timeouts, mismatches). Unexpected errors
/// stay `anyhow::Error` and are folded into the run's error list at the
/// orchestrator boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HarnessFailure {
    /// The assistant never replied to a conversation step.
    #[error("assistant reply not observed within {timeout_ms}ms for step '{step}'")]
    StepTimeout { step: String, timeout_ms: u64 },

    /// A reply arrived but lacked the expected content.
    #[error("step '{step}' reply did not contain '{expected}': got '{actual}'")]
    UnexpectedResponse {
        step: String,
        expected: String,
        actual: String,
    },

    /// A confirmation step did not put the client into its searching state.
    #[error("searching state not observed within {timeout_ms}ms")]
    SearchStateNotObserved { timeout_ms: u64 },

    /// Writing the fabricated callback record failed.
    #[error("storage write failed: {detail}")]
    StorageWrite { detail: String },

    /// Reading back callback state failed.
    #[error("storage read failed: {detail}")]
    StorageRead { detail: String },

    /// The UI never rendered the callback within the deadline.
    #[error("callback not rendered in UI within {deadline_ms}ms")]
    DeliveryTimeout { deadline_ms: u64 },

    /// The backend pending flag never flipped, independent of UI delivery.
    #[error("callback {record_id} not marked processed within {timeout_ms}ms")]
    ProcessedFlagTimeout { record_id: i64, timeout_ms: u64 },

    /// The automation layer itself failed (not a semantic outcome).
    #[error("page driver failure: {detail}")]
    Driver { detail: String },
}
