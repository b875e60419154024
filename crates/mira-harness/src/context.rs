use std::sync::Arc;

use mira_core::HarnessConfig;
use mira_driver::PageDriver;
use mira_storage::CallbackStore;

/// Everything one session run needs, threaded explicitly through every call.
/// There is no ambient global state anywhere in the harness.
#[derive(Clone)]
pub struct RunContext {
    pub store: Arc<dyn CallbackStore>,
    pub page: Arc<dyn PageDriver>,
    pub session_id: String,
    pub config: HarnessConfig,
}

impl RunContext {
    pub fn new(
        store: Arc<dyn CallbackStore>,
        page: Arc<dyn PageDriver>,
        session_id: impl Into<String>,
        config: HarnessConfig,
    ) -> Self {
        Self {
            store,
            page,
            session_id: session_id.into(),
            config,
        }
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}
