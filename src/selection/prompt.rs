//! Renders ranked tools into model instructions.

use super::context::SelectionContext;
use super::selector::ScoredTool;

/// Response contract the model is asked to follow.
const JSON_INSTRUCTION: &str = r#"Respond in strict JSON:
{
  "reply": "short natural language message",
  "toolPlan": [ { "actionId": "...", "arguments": { } } ],
  "toolCall": { "actionId": "...", "arguments": { } }
}
If no action is needed set toolPlan to [] and toolCall to null.
Use toolPlan for multi-step execution."#;

const RESTRICTION: &str = "You may only call actions from the list below.";

const BASE_PREAMBLE: &str = "You are A2Action — an assistant that routes user intent into client-side actions (tools).\n\nBe concise, safe, and predictable.";

/// Tool instruction block for the leading `max(1, top_k)` entries of `tools`.
///
/// `tools` must already be ranked; it is never re-sorted here.
pub fn build_tool_prompt(
    tools: &[ScoredTool<'_>],
    locale: &str,
    context: &SelectionContext,
    top_k: usize,
) -> String {
    let platform = context.platform().to_lowercase();

    let tool_lines: Vec<String> = tools
        .iter()
        .take(top_k.max(1))
        .map(|tool| {
            let reason = tool
                .reason
                .as_deref()
                .map(|r| format!(" • {}", r))
                .unwrap_or_default();
            format!(
                "- {} (score {:.2}{}): {}",
                tool.id,
                tool.score,
                reason,
                tool.def.guidance_for(&platform)
            )
        })
        .collect();

    [
        JSON_INSTRUCTION.to_string(),
        RESTRICTION.to_string(),
        format!("AVAILABLE ACTIONS (Top matches):\n{}", tool_lines.join("\n")),
        format!("Reply in the user's language ({}).", locale),
    ]
    .join("\n\n")
}

/// Full system prompt: assistant preamble, optional tool block, reply language.
pub fn build_system_prompt(locale: &str, tool_prompt: Option<&str>) -> String {
    let mut base = BASE_PREAMBLE.to_string();
    if let Some(tools) = tool_prompt.filter(|t| !t.is_empty()) {
        base.push_str("\n\n\n");
        base.push_str(tools);
    }
    format!("{}\n\n(Reply language: {})", base, locale)
}
