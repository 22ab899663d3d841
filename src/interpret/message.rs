use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form arguments supplied by the model. Always a JSON object.
pub type Arguments = Map<String, Value>;

/// One action invocation proposed by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub action_id: String,
    pub arguments: Arguments,
}

impl ToolCall {
    pub fn new(action_id: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            action_id: action_id.into(),
            arguments,
        }
    }
}

/// The structured reading of one raw model response.
///
/// `tool_call` and `tool_plan` may both be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretedMessage {
    pub reply: String,
    pub tool_call: Option<ToolCall>,
    pub tool_plan: Vec<ToolCall>,
}

impl InterpretedMessage {
    /// Reply-only message with no actions.
    pub fn plain(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            tool_call: None,
            tool_plan: Vec::new(),
        }
    }

    pub fn action_count(&self) -> usize {
        self.tool_plan.len() + usize::from(self.tool_call.is_some())
    }
}
