use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::network::NetworkConditions;

/// Selector wait target state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorState {
    Visible,
    Hidden,
}

/// One captured browser console line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLine {
    pub level: String,
    pub text: String,
    pub timestamp_ms: u64,
}

/// Driver-level failure. A deadline exceeded at a wait point is a typed
/// timeout, distinguishable from transport or protocol failure; callers
/// decide whether a timeout is fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },
    #[error("page driver failure: {0}")]
    Other(String),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Opaque browser automation capability.
///
/// Every wait accepts an explicit timeout; implementations must never block
/// unboundedly. The harness holds this behind `Arc<dyn PageDriver>` so one
/// scripted double can serve an entire scenario suite.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> DriverResult<()>;
    async fn fill(&self, selector: &str, text: &str) -> DriverResult<()>;
    async fn click(&self, selector: &str) -> DriverResult<()>;
    async fn wait_for_selector(
        &self,
        selector: &str,
        state: SelectorState,
        timeout_ms: u64,
    ) -> DriverResult<()>;
    async fn text_content(&self, selector: &str) -> DriverResult<String>;
    async fn count(&self, selector: &str) -> DriverResult<usize>;
    async fn is_visible(&self, selector: &str) -> DriverResult<bool>;
    async fn evaluate(&self, expression: &str) -> DriverResult<serde_json::Value>;
    async fn screenshot(&self) -> DriverResult<Vec<u8>>;
    async fn emulate_network(&self, conditions: &NetworkConditions) -> DriverResult<()>;
    /// Returns console lines captured since the previous drain.
    async fn drain_console(&self) -> DriverResult<Vec<ConsoleLine>>;
}
