use async_trait::async_trait;
use chrono::Utc;
use mira_core::{HarnessConfig, HarnessFailure};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::model::{CallbackPayload, CallbackRecordId};
use crate::store::CallbackStore;

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: CallbackRecordId,
}

#[derive(Debug, Deserialize)]
struct PendingRow {
    pending: bool,
}

/// [`CallbackStore`] over a PostgREST-style HTTP endpoint (the document store
/// the client under test subscribes to).
#[derive(Debug, Clone)]
pub struct RestCallbackStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    callback_table: String,
    session_table: String,
}

impl RestCallbackStore {
    pub fn new(config: &HarnessConfig) -> anyhow::Result<Self> {
        if config.storage_url.trim().is_empty() {
            anyhow::bail!("storage_url is required for the REST callback store");
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.storage_url.trim_end_matches('/').to_string(),
            api_key: config.storage_key.clone(),
            callback_table: config.callback_table.clone(),
            session_table: config.session_table.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn delete_by_session(
        &self,
        table: &str,
        session_id: &str,
    ) -> Result<(), HarnessFailure> {
        let response = self
            .authed(self.http.delete(self.table_url(table)))
            .query(&[("session_id", format!("eq.{session_id}"))])
            .send()
            .await
            .map_err(|error| HarnessFailure::StorageWrite {
                detail: format!("delete from {table} failed: {error}"),
            })?;
        if !response.status().is_success() {
            return Err(HarnessFailure::StorageWrite {
                detail: format!("delete from {table} returned {}", response.status()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CallbackStore for RestCallbackStore {
    async fn insert_callback(
        &self,
        session_id: &str,
        payload: &CallbackPayload,
    ) -> Result<CallbackRecordId, HarnessFailure> {
        let body = json!({
            "session_id": session_id,
            "payload": payload,
            "pending": true,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let response = self
            .authed(self.http.post(self.table_url(&self.callback_table)))
            .header("Prefer", "return=representation")
            .query(&[("select", "id")])
            .json(&body)
            .send()
            .await
            .map_err(|error| HarnessFailure::StorageWrite {
                detail: format!("insert request failed: {error}"),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarnessFailure::StorageWrite {
                detail: format!("insert returned {status}"),
            });
        }
        let rows: Vec<InsertedRow> =
            response
                .json()
                .await
                .map_err(|error| HarnessFailure::StorageWrite {
                    detail: format!("insert response was not parseable: {error}"),
                })?;
        let row = rows.first().ok_or_else(|| HarnessFailure::StorageWrite {
            detail: "insert returned no representation row".to_string(),
        })?;
        debug!(session_id, record_id = row.id, "callback row inserted");
        Ok(row.id)
    }

    async fn callback_pending(
        &self,
        record_id: CallbackRecordId,
    ) -> Result<bool, HarnessFailure> {
        let response = self
            .authed(self.http.get(self.table_url(&self.callback_table)))
            .query(&[
                ("id", format!("eq.{record_id}")),
                ("select", "pending".to_string()),
            ])
            .send()
            .await
            .map_err(|error| HarnessFailure::StorageRead {
                detail: format!("pending read failed: {error}"),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarnessFailure::StorageRead {
                detail: format!("pending read returned {status}"),
            });
        }
        let rows: Vec<PendingRow> =
            response
                .json()
                .await
                .map_err(|error| HarnessFailure::StorageRead {
                    detail: format!("pending response was not parseable: {error}"),
                })?;
        rows.first()
            .map(|row| row.pending)
            .ok_or_else(|| HarnessFailure::StorageRead {
                detail: format!("callback record {record_id} not found"),
            })
    }

    async fn delete_session_data(&self, session_id: &str) -> Result<(), HarnessFailure> {
        self.delete_by_session(&self.callback_table, session_id)
            .await?;
        self.delete_by_session(&self.session_table, session_id)
            .await
    }
}
