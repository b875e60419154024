use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    "https://lucy-chatbot.vercel.app".to_string()
}

fn default_callback_table() -> String {
    "callbacks".to_string()
}

fn default_session_table() -> String {
    "chat_sessions".to_string()
}

fn default_callback_timeout_ms() -> u64 {
    45_000
}

fn default_page_load_timeout_ms() -> u64 {
    15_000
}

fn default_response_timeout_ms() -> u64 {
    15_000
}

fn default_searching_state_timeout_ms() -> u64 {
    10_000
}

fn default_processed_poll_interval_ms() -> u64 {
    1_000
}

fn default_processed_timeout_ms() -> u64 {
    10_000
}

fn default_step_delay_ms() -> u64 {
    2_000
}

fn default_iteration_timeout_ms() -> u64 {
    60_000
}

fn default_delivery_fallback_timeout_ms() -> u64 {
    30_000
}

/// Harness configuration: target application, storage backend, and every
/// bounded-wait deadline used by the run. There is no unbounded wait anywhere,
/// so every wait point maps to exactly one field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub storage_url: String,
    #[serde(default)]
    pub storage_key: String,
    #[serde(default = "default_callback_table")]
    pub callback_table: String,
    #[serde(default = "default_session_table")]
    pub session_table: String,
    /// Path of the Playwright bridge CLI; empty means "not wired" (tests use
    /// in-process doubles instead).
    #[serde(default)]
    pub bridge_cli: String,
    #[serde(default = "default_callback_timeout_ms")]
    pub callback_timeout_ms: u64,
    #[serde(default = "default_page_load_timeout_ms")]
    pub page_load_timeout_ms: u64,
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    #[serde(default = "default_searching_state_timeout_ms")]
    pub searching_state_timeout_ms: u64,
    #[serde(default = "default_processed_poll_interval_ms")]
    pub processed_poll_interval_ms: u64,
    #[serde(default = "default_processed_timeout_ms")]
    pub processed_timeout_ms: u64,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    #[serde(default = "default_iteration_timeout_ms")]
    pub iteration_timeout_ms: u64,
    #[serde(default = "default_delivery_fallback_timeout_ms")]
    pub delivery_fallback_timeout_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config deserializes via serde defaults")
    }
}

impl HarnessConfig {
    /// Loads configuration: serde defaults, then the optional TOML file, then
    /// `MIRA_*` environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                toml::from_str::<Self>(&raw)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("MIRA_BASE_URL") {
            if !value.trim().is_empty() {
                self.base_url = value;
            }
        }
        if let Ok(value) = std::env::var("MIRA_STORAGE_URL") {
            if !value.trim().is_empty() {
                self.storage_url = value;
            }
        }
        if let Ok(value) = std::env::var("MIRA_STORAGE_KEY") {
            if !value.trim().is_empty() {
                self.storage_key = value;
            }
        }
        if let Ok(value) = std::env::var("MIRA_BRIDGE_CLI") {
            if !value.trim().is_empty() {
                self.bridge_cli = value;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("base_url cannot be empty");
        }
        if self.callback_table.trim().is_empty() || self.session_table.trim().is_empty() {
            bail!("storage table names cannot be empty");
        }
        let timeouts = [
            ("callback_timeout_ms", self.callback_timeout_ms),
            ("page_load_timeout_ms", self.page_load_timeout_ms),
            ("response_timeout_ms", self.response_timeout_ms),
            ("searching_state_timeout_ms", self.searching_state_timeout_ms),
            (
                "processed_poll_interval_ms",
                self.processed_poll_interval_ms,
            ),
            ("processed_timeout_ms", self.processed_timeout_ms),
            ("iteration_timeout_ms", self.iteration_timeout_ms),
            (
                "delivery_fallback_timeout_ms",
                self.delivery_fallback_timeout_ms,
            ),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                bail!("{name} must be greater than 0");
            }
        }
        Ok(())
    }
}
