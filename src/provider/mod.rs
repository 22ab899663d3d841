pub mod chat;
pub mod planner;

pub use chat::{ChatCompletion, ChatMessage, ChatProvider, ChatRequest, Role};
