//! Offline keyword planner used by `A2ACTION_MOCK_MODE=router`.
//!
//! Emits the same strict-JSON shape a real model would, so the whole
//! interpret-and-filter path runs without a provider. Only the demo actions
//! are known, and each is proposed only when the client allows it.

use super::chat::{ChatMessage, Role};
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::LazyLock;

const SCAN: &str = "demo.storage.scan.v1";
const OPEN_URL: &str = "demo.url.open.v1";
const OPEN_PLAYLIST: &str = "demo.playlist.open.v1";
const ECHO: &str = "demo.echo.v1";

const SCAN_KEYWORDS: &[&str] = &["scan", "storage", "junk"];
const SCAN_KEYWORDS_ZH: &[&str] = &["扫描", "清理"];

/// Build a `{reply, toolPlan, toolCall}` response for the latest user turn.
pub fn plan(messages: &[ChatMessage], allowed: &HashSet<String>, locale: &str) -> Value {
    let user_text = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("");
    let normalized = user_text.to_lowercase();
    let url = extract_first_url(user_text);

    let has_scan_intent = SCAN_KEYWORDS.iter().any(|k| normalized.contains(k))
        || SCAN_KEYWORDS_ZH.iter().any(|k| user_text.contains(k));
    let is_playlist_url = url
        .as_deref()
        .map(|u| u.to_lowercase().contains(".m3u"))
        .unwrap_or(false);

    let can = |id: &str| allowed.contains(id);
    let zh = locale.to_lowercase().starts_with("zh") || contains_cjk(user_text);
    let say = |en: &str, cn: &str| if zh { cn.to_string() } else { en.to_string() };

    let mut tool_plan: Vec<Value> = Vec::new();
    let mut tool_call = Value::Null;
    let reply;

    match url.as_deref() {
        Some(url) if has_scan_intent && can(SCAN) && (can(OPEN_PLAYLIST) || can(OPEN_URL)) => {
            tool_plan.push(json!({"actionId": SCAN, "arguments": {"depth": 3}}));
            if is_playlist_url && can(OPEN_PLAYLIST) {
                tool_plan.push(json!({"actionId": OPEN_PLAYLIST, "arguments": {"url": url}}));
            } else if can(OPEN_URL) {
                tool_plan.push(json!({"actionId": OPEN_URL, "arguments": {"url": url}}));
            }
            reply = say(
                "I will scan first, then handle the link.",
                "我先执行扫描，然后继续处理链接。",
            );
        }
        Some(url) if is_playlist_url && can(OPEN_PLAYLIST) => {
            tool_call = json!({"actionId": OPEN_PLAYLIST, "arguments": {"url": url}});
            reply = say("Opening the playlist.", "我来打开播放列表。");
        }
        Some(url) if can(OPEN_URL) => {
            tool_call = json!({"actionId": OPEN_URL, "arguments": {"url": url}});
            reply = say("Opening the link.", "我来打开链接。");
        }
        _ if has_scan_intent && can(SCAN) => {
            tool_call = json!({"actionId": SCAN, "arguments": {"depth": 3}});
            reply = say("Running a storage scan.", "我来做一次存储扫描。");
        }
        _ if can(ECHO) => {
            tool_call = json!({"actionId": ECHO, "arguments": {"text": user_text}});
            reply = say("Echoing your input (demo).", "我来复述一遍你的输入（用于演示）。");
        }
        _ => {
            reply = say(
                "No matching action. Check the client capability list.",
                "没有匹配到可执行动作，请检查客户端 capability 列表。",
            );
        }
    }

    json!({"reply": reply, "toolPlan": tool_plan, "toolCall": tool_call})
}

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://\S+").expect("valid URL regex"));

/// First `http(s)://` run of non-whitespace, minus trailing `)`, `,`, `.`.
pub fn extract_first_url(text: &str) -> Option<String> {
    let found = URL_RE.find(text)?;
    Some(found.as_str().trim_end_matches([')', ',', '.']).to_string())
}

fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}
