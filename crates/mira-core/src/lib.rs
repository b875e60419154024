//! Foundational utilities shared across mira crates.
//!
//! Provides session identity generation, time helpers, harness configuration
//! loading, and the typed failure taxonomy used by run results.

pub mod config;
pub mod failure;
pub mod session;
pub mod time_utils;

pub use config::HarnessConfig;
pub use failure::HarnessFailure;
pub use session::{generate_session_id, is_harness_session_id};
pub use time_utils::current_unix_timestamp_ms;
