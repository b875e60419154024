use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row identifier assigned by storage on insert.
pub type CallbackRecordId = i64;

/// One property result inside a callback payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyListing {
    pub property_id: String,
    pub title: String,
    pub thumbnail: String,
    pub price: f64,
    pub floor: String,
    pub size: f64,
    pub rooms: u32,
    pub bathrooms: u32,
    pub images: Vec<String>,
}

impl PropertyListing {
    pub fn validate(&self) -> Result<()> {
        if self.property_id.trim().is_empty() {
            bail!("property_id cannot be empty");
        }
        if self.price < 0.0 {
            bail!("property '{}' has negative price", self.property_id);
        }
        if self.size <= 0.0 {
            bail!("property '{}' has non-positive size", self.property_id);
        }
        if self.images.is_empty() {
            bail!("property '{}' has no images", self.property_id);
        }
        Ok(())
    }
}

/// The payload blob a fabricated callback carries: an assistant message plus
/// an ordered list of property results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub message: String,
    pub properties: Vec<PropertyListing>,
}

impl CallbackPayload {
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Property ids must be unique within one payload. No cross-payload
    /// uniqueness is required.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for property in &self.properties {
            property.validate()?;
            if !seen.insert(property.property_id.as_str()) {
                bail!("duplicate property_id '{}' in payload", property.property_id);
            }
        }
        Ok(())
    }
}

/// Persisted callback record. Created by the harness, consumed exactly once
/// by the client under test (which flips `pending` to false), deleted by the
/// harness at session teardown regardless of outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackRecord {
    pub id: CallbackRecordId,
    pub session_id: String,
    pub payload: CallbackPayload,
    pub pending: bool,
    pub updated_at: DateTime<Utc>,
}
