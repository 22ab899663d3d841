//! Model response interpretation.
//!
//! Raw model text is parsed into an [`InterpretedMessage`] by [`interpret`]
//! and must then pass [`filter_to_allowed`] before it leaves the service.

pub mod allow_list;
pub mod message;
pub mod parser;

pub use allow_list::filter_to_allowed;
pub use message::{Arguments, InterpretedMessage, ToolCall};
pub use parser::interpret;
