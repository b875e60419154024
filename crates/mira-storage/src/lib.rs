//! Storage adapter for the callback delivery pipeline under test.
//!
//! The harness fabricates asynchronous search callbacks by inserting rows
//! directly into the shared document store, standing in for the production
//! message-queue publisher. That substitution lives entirely behind the
//! [`CallbackStore`] seam so a future swap to a real event bus only changes
//! this crate.

pub mod memory;
pub mod model;
pub mod rest;
pub mod store;

pub use memory::MemoryCallbackStore;
pub use model::{CallbackPayload, CallbackRecord, CallbackRecordId, PropertyListing};
pub use rest::RestCallbackStore;
pub use store::CallbackStore;
