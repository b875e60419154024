//! Session data cleanup: best-effort, idempotent, runs on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mira_storage::CallbackStore;
use tracing::{debug, warn};

/// Deletes everything a session wrote to the shared store. `run` may be
/// called any number of times; only the first call deletes. Dropping the
/// guard without having run it spawns a last-chance delete on the current
/// runtime.
pub struct SessionCleanup {
    store: Arc<dyn CallbackStore>,
    session_id: String,
    done: AtomicBool,
}

impl SessionCleanup {
    pub fn new(store: Arc<dyn CallbackStore>, session_id: impl Into<String>) -> Self {
        Self {
            store,
            session_id: session_id.into(),
            done: AtomicBool::new(false),
        }
    }

    /// Cleanup failures are logged and swallowed; a QA run's verdict never
    /// hinges on teardown.
    pub async fn run(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.store.delete_session_data(&self.session_id).await {
            Ok(()) => debug!(session_id = %self.session_id, "session data cleaned up"),
            Err(error) => {
                warn!(session_id = %self.session_id, %error, "session cleanup failed");
            }
        }
    }
}

impl Drop for SessionCleanup {
    fn drop(&mut self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = Arc::clone(&self.store);
            let session_id = self.session_id.clone();
            handle.spawn(async move {
                if let Err(error) = store.delete_session_data(&session_id).await {
                    warn!(session_id = %session_id, %error, "drop-time session cleanup failed");
                }
            });
        }
    }
}
