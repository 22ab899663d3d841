//! Tolerant parsing of model output.
//!
//! The model is asked for strict JSON but is untrusted. Parsing is two-tier:
//!
//! 1. Parse the whole text as a JSON object.
//! 2. Otherwise slice from the first `{` to the last `}` and try once more.
//!
//! If both fail the trimmed raw text becomes the reply. Recovery is a single
//! extra attempt, never open-ended.

use super::message::{Arguments, InterpretedMessage, ToolCall};
use crate::error::{AppError, Result};
use serde_json::{Map, Value};

/// Interpret raw model text. Never fails.
pub fn interpret(raw: &str) -> InterpretedMessage {
    match parse_message(raw) {
        Ok(message) => message,
        Err(first) => match recover_braced(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %first, recovery = %e, "Model output is plain text");
                InterpretedMessage::plain(raw.trim())
            }
        },
    }
}

/// Strict tier: the entire text must be a JSON object.
pub fn parse_message(raw: &str) -> Result<InterpretedMessage> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::ParseRecoveryFailure(format!("invalid JSON: {}", e)))?;

    let obj = value
        .as_object()
        .ok_or_else(|| AppError::ParseRecoveryFailure("JSON root is not an object".into()))?;

    Ok(from_object(obj, raw))
}

/// Recovery tier: retry on the outermost `{ ... }` slice, if it differs from `raw`.
fn recover_braced(raw: &str) -> Result<InterpretedMessage> {
    let candidate = braced_slice(raw)
        .filter(|candidate| *candidate != raw)
        .ok_or_else(|| AppError::ParseRecoveryFailure("no distinct brace pair".into()))?;

    parse_message(candidate)
}

fn braced_slice(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end > start {
        raw.get(start..=end)
    } else {
        None
    }
}

fn from_object(obj: &Map<String, Value>, raw: &str) -> InterpretedMessage {
    let reply = obj
        .get("reply")
        .and_then(Value::as_str)
        .map(|r| r.trim().to_string())
        .unwrap_or_else(|| raw.trim().to_string());

    let tool_plan = obj
        .get("toolPlan")
        .and_then(Value::as_array)
        .map(|steps| steps.iter().filter_map(tool_call_from).collect())
        .unwrap_or_default();

    let tool_call = obj.get("toolCall").and_then(tool_call_from);

    InterpretedMessage {
        reply,
        tool_call,
        tool_plan,
    }
}

/// An object with a non-empty string `actionId`; non-object arguments become `{}`.
fn tool_call_from(value: &Value) -> Option<ToolCall> {
    let obj = value.as_object()?;

    let action_id = obj
        .get("actionId")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())?;

    let arguments = match obj.get("arguments") {
        Some(Value::Object(args)) => args.clone(),
        _ => Arguments::new(),
    };

    Some(ToolCall::new(action_id, arguments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_strict_json() {
        let raw = r#"{"reply":" Opening. ","toolPlan":[],"toolCall":{"actionId":"demo.url.open.v1","arguments":{"url":"https://a.b"}}}"#;
        let msg = interpret(raw);

        assert_eq!(msg.reply, "Opening.");
        assert!(msg.tool_plan.is_empty());
        assert_eq!(
            msg.tool_call,
            Some(ToolCall::new("demo.url.open.v1", args(json!({"url": "https://a.b"}))))
        );
    }

    #[test]
    fn test_prose_wrapped_json_is_recovered() {
        let raw = r#"Sure! {"reply":"ok","toolPlan":[],"toolCall":{"actionId":"x.y","arguments":{"a":1}}}"#;
        let msg = interpret(raw);

        assert_eq!(msg.reply, "ok");
        assert_eq!(msg.tool_call, Some(ToolCall::new("x.y", args(json!({"a": 1})))));
        assert!(msg.tool_plan.is_empty());
    }

    #[test]
    fn test_markdown_fenced_json_is_recovered() {
        let raw = "```json\n{\"reply\":\"done\",\"toolPlan\":[{\"actionId\":\"a\"}],\"toolCall\":null}\n```";
        let msg = interpret(raw);

        assert_eq!(msg.reply, "done");
        assert_eq!(msg.tool_plan, vec![ToolCall::new("a", Arguments::new())]);
        assert!(msg.tool_call.is_none());
    }

    #[test]
    fn test_plain_sentence() {
        let msg = interpret("  just a plain sentence \n");

        assert_eq!(msg.reply, "just a plain sentence");
        assert!(msg.tool_call.is_none());
        assert!(msg.tool_plan.is_empty());
    }

    #[test]
    fn test_unrecoverable_braces_fall_back_to_raw_text() {
        let raw = "here is {not json} and more";
        let msg = interpret(raw);

        assert_eq!(msg, InterpretedMessage::plain(raw));
    }

    #[test]
    fn test_reversed_braces_fall_back() {
        let msg = interpret("} oops {");
        assert_eq!(msg.reply, "} oops {");
    }

    #[test]
    fn test_invalid_json_object_does_not_recurse_forever() {
        // The brace slice equals the input, so there is no second attempt.
        let raw = "{\"reply\": }";
        assert_eq!(interpret(raw).reply, raw);
    }

    #[test]
    fn test_non_object_json_tries_recovery() {
        let msg = interpret(r#"[{"reply":"inside array"}]"#);
        assert_eq!(msg.reply, "inside array");

        let msg = interpret("42");
        assert_eq!(msg, InterpretedMessage::plain("42"));
    }

    #[test]
    fn test_missing_reply_uses_raw_text() {
        let raw = r#"{"toolCall":{"actionId":"a"}}"#;
        let msg = interpret(raw);

        assert_eq!(msg.reply, raw);
        assert_eq!(msg.tool_call.unwrap().action_id, "a");
    }

    #[test]
    fn test_plan_steps_are_coerced() {
        let raw = json!({
            "reply": "plan",
            "toolPlan": [
                {"actionId": "first", "arguments": {"depth": 3}},
                {"actionId": "", "arguments": {}},
                {"actionId": 7},
                "not an object",
                {"actionId": " second ", "arguments": ["list"]},
                {"arguments": {}}
            ]
        })
        .to_string();

        let msg = interpret(&raw);

        assert_eq!(
            msg.tool_plan,
            vec![
                ToolCall::new("first", args(json!({"depth": 3}))),
                ToolCall::new("second", Arguments::new()),
            ]
        );
    }

    #[test]
    fn test_tool_plan_not_array_is_empty() {
        let msg = interpret(r#"{"reply":"x","toolPlan":{"actionId":"a"}}"#);
        assert!(msg.tool_plan.is_empty());
    }

    #[test]
    fn test_tool_call_with_empty_action_is_null() {
        let msg = interpret(r#"{"reply":"x","toolCall":{"actionId":"   ","arguments":{}}}"#);
        assert!(msg.tool_call.is_none());
    }

    #[test]
    fn test_parse_message_reports_failure() {
        assert!(matches!(
            parse_message("nope"),
            Err(AppError::ParseRecoveryFailure(_))
        ));
    }
}
