//! Tool registry: the static catalog of actions a client may declare.
//!
//! The registry asset maps tool identifiers to guidance text and signal tags.
//! It is read once at startup and shared read-only across requests.

pub mod loader;
pub mod types;

pub use loader::ToolRegistry;
pub use types::{ToolDefinition, SIGNAL_IMAGE, SIGNAL_URL_M3U};
