//! Tool retrieval and ranking.
//!
//! Given a seed utterance and the client's declared capabilities, pick the
//! most relevant registry tools and render them into model instructions.

pub mod context;
pub mod prompt;
pub mod selector;
pub mod similarity;

pub use context::{Attachment, SelectionContext};
pub use prompt::{build_system_prompt, build_tool_prompt};
pub use selector::{score_candidates, ScoredTool, SignalScores, ToolSelector};
pub use similarity::cosine_similarity;
