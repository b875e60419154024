//! Browser automation capability consumed by the harness.
//!
//! The harness treats page automation as an opaque capability behind the
//! [`PageDriver`] contract; the bundled implementation bridges to a Playwright
//! CLI subprocess speaking JSON over argv/stdout.

pub mod markers;
pub mod network;
pub mod page;
pub mod playwright;

pub use network::NetworkConditions;
pub use page::{ConsoleLine, DriverError, DriverResult, PageDriver, SelectorState};
pub use playwright::PlaywrightCliPageDriver;
