use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use mira_core::HarnessFailure;

use crate::model::{CallbackPayload, CallbackRecord, CallbackRecordId};
use crate::store::CallbackStore;

#[derive(Debug, Default)]
struct MemoryState {
    next_id: CallbackRecordId,
    callbacks: Vec<CallbackRecord>,
    chat_sessions: HashSet<String>,
    fail_next_insert: Option<String>,
}

/// In-memory [`CallbackStore`] used by tests and local dry runs.
///
/// Besides the store contract it exposes the handles the real client under
/// test would exercise: flipping `pending` on consumption and inspecting rows
/// per session.
#[derive(Debug, Clone, Default)]
pub struct MemoryCallbackStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCallbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a chat-session row, mirroring what the client creates when a
    /// conversation starts. Cleanup must remove it.
    pub fn register_chat_session(&self, session_id: &str) {
        let mut state = self.state.lock().expect("memory store lock");
        state.chat_sessions.insert(session_id.to_string());
    }

    /// Simulates the client consuming a record: flips `pending` to false.
    /// Returns false when the record does not exist.
    pub fn mark_processed(&self, record_id: CallbackRecordId) -> bool {
        let mut state = self.state.lock().expect("memory store lock");
        match state.callbacks.iter_mut().find(|row| row.id == record_id) {
            Some(row) => {
                row.pending = false;
                row.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn records_for_session(&self, session_id: &str) -> Vec<CallbackRecord> {
        let state = self.state.lock().expect("memory store lock");
        state
            .callbacks
            .iter()
            .filter(|row| row.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn chat_session_exists(&self, session_id: &str) -> bool {
        let state = self.state.lock().expect("memory store lock");
        state.chat_sessions.contains(session_id)
    }

    /// Arms a one-shot insert failure with the given detail, for exercising
    /// the `StorageWrite` path.
    pub fn fail_next_insert(&self, detail: &str) {
        let mut state = self.state.lock().expect("memory store lock");
        state.fail_next_insert = Some(detail.to_string());
    }
}

#[async_trait]
impl CallbackStore for MemoryCallbackStore {
    async fn insert_callback(
        &self,
        session_id: &str,
        payload: &CallbackPayload,
    ) -> Result<CallbackRecordId, HarnessFailure> {
        let mut state = self.state.lock().expect("memory store lock");
        if let Some(detail) = state.fail_next_insert.take() {
            return Err(HarnessFailure::StorageWrite { detail });
        }
        state.next_id += 1;
        let id = state.next_id;
        state.callbacks.push(CallbackRecord {
            id,
            session_id: session_id.to_string(),
            payload: payload.clone(),
            pending: true,
            updated_at: Utc::now(),
        });
        Ok(id)
    }

    async fn callback_pending(
        &self,
        record_id: CallbackRecordId,
    ) -> Result<bool, HarnessFailure> {
        let state = self.state.lock().expect("memory store lock");
        state
            .callbacks
            .iter()
            .find(|row| row.id == record_id)
            .map(|row| row.pending)
            .ok_or_else(|| HarnessFailure::StorageRead {
                detail: format!("callback record {record_id} not found"),
            })
    }

    async fn delete_session_data(&self, session_id: &str) -> Result<(), HarnessFailure> {
        let mut state = self.state.lock().expect("memory store lock");
        state.callbacks.retain(|row| row.session_id != session_id);
        state.chat_sessions.remove(session_id);
        Ok(())
    }
}
