//! Chat orchestration handler.
//!
//! One turn goes through these stages:
//!
//! 1. **Coercion**: every payload field is loosely typed, so each is
//!    normalized on its own and bad values fall back to defaults
//! 2. **Selection**: the client's capabilities are ranked (`rag.v2`) or
//!    listed as-is (`legacy.v1`) into the system prompt
//! 3. **Completion**: the chat provider answers the conversation
//! 4. **Interpretation**: the raw reply becomes text plus proposed actions,
//!    and every action outside the client's capability list is dropped

use crate::config::RagMode;
use crate::error::{AppError, Result};
use crate::interpret::{filter_to_allowed, interpret, ToolCall};
use crate::provider::{ChatMessage, ChatRequest, Role};
use crate::selection::{
    build_system_prompt, build_tool_prompt, Attachment, ScoredTool, SelectionContext,
};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

pub const MAX_MESSAGE_CHARS: usize = 4_000;
pub const MAX_HISTORY_ITEMS: usize = 12;
pub const MAX_CAPABILITIES: usize = 80;
pub const MAX_ATTACHMENTS: usize = 8;

const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub locale: String,
    pub content: String,
    pub usage: Option<Value>,
    pub tool_call: Option<ToolCall>,
    pub tool_plan: Vec<ToolCall>,
}

/// POST /chat - Route one user turn into a reply and client-side actions.
///
/// The payload is `{prompt, messages, locale, temperature, context}`, all
/// optional, but at least one of `prompt` or `messages` must yield a turn.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<ChatResponse>> {
    let start_time = Instant::now();
    let request_id = uuid::Uuid::new_v4();

    let locale = normalize_locale(payload.get("locale"));
    let temperature = safe_temperature(payload.get("temperature"), state.config.default_temperature);
    let prompt = payload
        .get("prompt")
        .and_then(Value::as_str)
        .map(clamp_text)
        .unwrap_or_default();

    let mut history: Vec<ChatMessage> = coerce_history(payload.get("messages"))
        .into_iter()
        .filter(|m| m.role != Role::System)
        .collect();
    let ends_with_user = history.last().map(|m| m.role == Role::User).unwrap_or(false);
    if !prompt.is_empty() && !ends_with_user {
        history.push(ChatMessage::new(Role::User, prompt.clone()));
    }
    if prompt.is_empty() && history.is_empty() {
        metrics::counter!("chat_requests_total", "status" => "invalid").increment(1);
        return Err(AppError::ValidationError(
            "A prompt or message history is required.".to_string(),
        ));
    }

    let context = sanitize_context(payload.get("context"), &locale);
    let allowed = context.allowed_action_ids();
    let seed = if prompt.is_empty() {
        latest_user_text(&history).to_string()
    } else {
        prompt
    };

    tracing::info!(
        %request_id,
        locale = %locale,
        temperature,
        rag_mode = context.rag_mode.as_str(),
        capabilities = context.client_capability_ids.len(),
        last_active_tool_id = ?context.last_active_tool_id,
        "Chat request"
    );

    let tool_prompt = dynamic_tool_prompt(&state, &seed, &context).await;
    let system_prompt = build_system_prompt(&locale, tool_prompt.as_deref());

    let mut conversation = Vec::with_capacity(history.len() + 1);
    conversation.push(ChatMessage::new(Role::System, system_prompt));
    conversation.extend(history);

    let completion = state
        .chat
        .complete(ChatRequest {
            messages: &conversation,
            temperature,
            locale: &locale,
            allowed_action_ids: &allowed,
        })
        .await
        .map_err(|e| {
            tracing::warn!(%request_id, error = %e, "Chat provider failed");
            metrics::counter!("chat_requests_total", "status" => "error").increment(1);
            e
        })?;

    let interpreted = interpret(&completion.content);
    let content = interpreted.reply.clone();
    let filtered = filter_to_allowed(&allowed, interpreted);

    let elapsed = start_time.elapsed();
    metrics::counter!("chat_requests_total", "status" => "ok").increment(1);
    metrics::histogram!("chat_latency_ms").record(elapsed.as_secs_f64() * 1000.0);

    tracing::info!(
        %request_id,
        provider = state.chat.name(),
        actions = filtered.action_count(),
        latency_ms = elapsed.as_millis() as u64,
        "Chat request completed"
    );

    Ok(Json(ChatResponse {
        locale,
        content,
        usage: completion.usage,
        tool_call: filtered.tool_call,
        tool_plan: filtered.tool_plan,
    }))
}

/// Tool block for the system prompt, or `None` when nothing is offerable.
async fn dynamic_tool_prompt(
    state: &AppState,
    seed: &str,
    context: &SelectionContext,
) -> Option<String> {
    if context.client_capability_ids.is_empty() {
        return None;
    }

    let selector = state.selector();
    let (tools, top_k): (Vec<ScoredTool<'_>>, usize) = match context.rag_mode {
        RagMode::Rag => {
            let scored = selector.select(seed, context).await;
            tracing::info!(
                top = ?scored.iter().take(5).map(|t| format!("{}:{:.2}", t.id, t.score)).collect::<Vec<_>>(),
                "Tool selection"
            );
            (scored, state.config.top_k)
        }
        RagMode::Legacy => {
            let listed: Vec<ScoredTool<'_>> = selector
                .candidates(context)
                .into_iter()
                .map(|(id, def)| ScoredTool::unscored(id, def))
                .collect();
            let count = listed.len();
            (listed, count)
        }
    };

    if tools.is_empty() {
        return None;
    }
    Some(build_tool_prompt(&tools, &context.locale, context, top_k))
}

/// Trim, then keep at most `MAX_MESSAGE_CHARS` characters.
pub fn clamp_text(value: &str) -> String {
    value.trim().chars().take(MAX_MESSAGE_CHARS).collect()
}

pub fn normalize_locale(raw: Option<&Value>) -> String {
    raw.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LOCALE)
        .to_string()
}

/// Finite numbers (or numeric strings) clamped to [0, 1]; anything else is `default`.
pub fn safe_temperature(raw: Option<&Value>, default: f32) -> f32 {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(t) if t.is_finite() => t.clamp(0.0, 1.0) as f32,
        _ => default,
    }
}

/// Keep well-formed `{role, content}` entries, at most `MAX_HISTORY_ITEMS`.
pub fn coerce_history(raw: Option<&Value>) -> Vec<ChatMessage> {
    let Some(entries) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let role = entry.get("role").and_then(Value::as_str).and_then(Role::parse)?;
            let content = entry.get("content").and_then(Value::as_str)?;
            Some(ChatMessage::new(role, clamp_text(content)))
        })
        .take(MAX_HISTORY_ITEMS)
        .collect()
}

fn latest_user_text(history: &[ChatMessage]) -> &str {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

/// Build a [`SelectionContext`] from the loosely typed `context` object.
///
/// Non-object input yields the default context: no capabilities, `legacy.v1`.
pub fn sanitize_context(raw: Option<&Value>, locale: &str) -> SelectionContext {
    let mut context = SelectionContext {
        locale: locale.to_string(),
        ..SelectionContext::default()
    };

    let Some(obj) = raw.and_then(Value::as_object) else {
        return context;
    };

    context.platform = trimmed_str(obj, "platform").map(|p| p.to_lowercase());
    context.last_active_tool_id = trimmed_str(obj, "lastActiveToolId").map(str::to_string);

    if let Some(mode) = obj.get("ragMode").and_then(Value::as_str).and_then(RagMode::parse) {
        context.rag_mode = mode;
    }

    if let Some(ids) = obj.get("clientCapabilityIds").and_then(Value::as_array) {
        context.client_capability_ids = ids
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .take(MAX_CAPABILITIES)
            .map(str::to_string)
            .collect();
    }

    if let Some(attachments) = obj.get("attachments").and_then(Value::as_array) {
        context.attachments = attachments
            .iter()
            .filter_map(Value::as_object)
            .take(MAX_ATTACHMENTS)
            .map(|a| Attachment {
                name: string_field(a, "name"),
                kind: string_field(a, "kind"),
                mime_type: string_field(a, "mimeType"),
            })
            .collect();
    }

    context
}

fn trimmed_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}
