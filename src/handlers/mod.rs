pub mod chat;
pub mod health;

pub use chat::chat_handler;
pub use health::{health_handler, ready_handler};
