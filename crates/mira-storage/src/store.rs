use async_trait::async_trait;
use mira_core::HarnessFailure;

use crate::model::{CallbackPayload, CallbackRecordId};

/// Contract over the persistence backend shared with the client under test.
///
/// Every operation is scoped by session identifier; the harness never assumes
/// row-level locking and never mutates `pending` itself — that flip belongs
/// exclusively to the client's consumption logic.
#[async_trait]
pub trait CallbackStore: Send + Sync {
    /// Inserts a callback row with `pending = true`, returning the id storage
    /// assigned. A write failure is fatal to the active iteration and is not
    /// retried here.
    async fn insert_callback(
        &self,
        session_id: &str,
        payload: &CallbackPayload,
    ) -> Result<CallbackRecordId, HarnessFailure>;

    /// Reads the pending flag of one record. A missing record surfaces as
    /// `StorageRead` so divergence between UI and backend stays diagnosable.
    async fn callback_pending(&self, record_id: CallbackRecordId)
        -> Result<bool, HarnessFailure>;

    /// Deletes all rows for `session_id` from both the callback table and the
    /// chat-session table. Idempotent: deleting an already-clean session is a
    /// success.
    async fn delete_session_data(&self, session_id: &str) -> Result<(), HarnessFailure>;
}
