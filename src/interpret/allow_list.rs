use super::message::InterpretedMessage;
use std::collections::HashSet;

/// Drop every proposed action the client did not declare for this turn.
///
/// This is the security boundary for model output: prompt restrictions are
/// advisory, this filter is not. Every message leaving the core passes here.
pub fn filter_to_allowed(allowed: &HashSet<String>, message: InterpretedMessage) -> InterpretedMessage {
    let before = message.action_count();

    let tool_plan: Vec<_> = message
        .tool_plan
        .into_iter()
        .filter(|step| allowed.contains(&step.action_id))
        .collect();

    let tool_call = message
        .tool_call
        .filter(|call| allowed.contains(&call.action_id));

    let filtered = InterpretedMessage {
        reply: message.reply,
        tool_call,
        tool_plan,
    };

    let dropped = before - filtered.action_count();
    if dropped > 0 {
        tracing::warn!(dropped, "Model proposed actions outside the allowed set");
        metrics::counter!("actions_filtered_total").increment(dropped as u64);
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpret::message::{Arguments, ToolCall};

    fn call(id: &str) -> ToolCall {
        ToolCall::new(id, Arguments::new())
    }

    fn allowed(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_keeps_allowed_actions() {
        let message = InterpretedMessage {
            reply: "ok".into(),
            tool_call: Some(call("a")),
            tool_plan: vec![call("a"), call("b")],
        };

        let filtered = filter_to_allowed(&allowed(&["a", "b"]), message.clone());
        assert_eq!(filtered, message);
    }

    #[test]
    fn test_drops_disallowed_steps_preserving_order() {
        let message = InterpretedMessage {
            reply: "ok".into(),
            tool_call: Some(call("evil")),
            tool_plan: vec![call("c"), call("evil"), call("a")],
        };

        let filtered = filter_to_allowed(&allowed(&["a", "c"]), message);

        assert!(filtered.tool_call.is_none());
        assert_eq!(filtered.tool_plan, vec![call("c"), call("a")]);
        assert_eq!(filtered.reply, "ok");
    }

    #[test]
    fn test_everything_disallowed() {
        let message = InterpretedMessage {
            reply: "r".into(),
            tool_call: Some(call("x")),
            tool_plan: vec![call("y"), call("z")],
        };

        let filtered = filter_to_allowed(&HashSet::new(), message);

        assert!(filtered.tool_call.is_none());
        assert!(filtered.tool_plan.is_empty());
    }

    #[test]
    fn test_match_is_exact() {
        let message = InterpretedMessage {
            reply: String::new(),
            tool_call: Some(call("Demo.Echo.v1")),
            tool_plan: vec![call("demo.echo.v1 ")],
        };

        let filtered = filter_to_allowed(&allowed(&["demo.echo.v1"]), message);
        assert_eq!(filtered.action_count(), 0);
    }

    #[test]
    fn test_client_declared_id_kept_without_registry_entry() {
        let message = crate::interpret::interpret(
            r#"{"reply":"ok","toolPlan":[{"actionId":"vendor.unknown.v1"}],"toolCall":{"actionId":"demo.echo.v1"}}"#,
        );

        let filtered = filter_to_allowed(&allowed(&["vendor.unknown.v1"]), message);
        assert_eq!(filtered.tool_plan, vec![call("vendor.unknown.v1")]);
        assert!(filtered.tool_call.is_none());
    }
}
