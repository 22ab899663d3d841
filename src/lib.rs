//! A2Action - routes natural-language requests into client-side actions
//!
//! This library exposes the core components of the orchestration service,
//! enabling integration tests and the offline `build-vectors` tool.

pub mod config;
pub mod embedding;
pub mod error;
pub mod handlers;
pub mod interpret;
pub mod persistence;
pub mod provider;
pub mod registry;
pub mod selection;
pub mod state;

// Re-export key types for convenience
pub use config::Config;
pub use error::{AppError, Result};
pub use handlers::{chat_handler, health_handler, ready_handler};
pub use interpret::{filter_to_allowed, interpret, InterpretedMessage, ToolCall};
pub use registry::{ToolDefinition, ToolRegistry};
pub use selection::{SelectionContext, ToolSelector};
pub use state::AppState;
