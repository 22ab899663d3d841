//! Chat-completion provider.
//!
//! Either a live OpenAI-compatible `/chat/completions` endpoint or one of
//! two offline mocks selected by `A2ACTION_MOCK_MODE`.

use super::planner;
use crate::config::{Config, MockMode};
use crate::embedding::remote::truncate_chars;
use crate::error::{AppError, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

const MAX_ERROR_BODY: usize = 1000;
const STATIC_MOCK_REPLY: &str = "(mock) Ready.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Everything a provider needs for one turn.
pub struct ChatRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub locale: &'a str,
    pub allowed_action_ids: &'a HashSet<String>,
}

/// Raw model text plus provider usage stats, if any.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub usage: Option<Value>,
}

pub enum ChatProvider {
    Remote(RemoteChat),
    Static,
    Router,
}

impl ChatProvider {
    pub fn from_config(config: &Config) -> Self {
        match config.mock_mode {
            MockMode::Router => Self::Router,
            MockMode::Static => Self::Static,
            MockMode::Off => Self::Remote(RemoteChat::from_config(config)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Remote(_) => "remote",
            Self::Static => "mock-static",
            Self::Router => "mock-router",
        }
    }

    /// # Errors
    /// Remote only: `ConfigurationError`, `ProviderError`, `DeadlineExceeded`.
    pub async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatCompletion> {
        match self {
            Self::Remote(remote) => remote.complete(&request).await,
            Self::Static => Ok(ChatCompletion {
                content: json!({"reply": STATIC_MOCK_REPLY, "toolPlan": [], "toolCall": null})
                    .to_string(),
                usage: None,
            }),
            Self::Router => Ok(ChatCompletion {
                content: planner::plan(
                    request.messages,
                    request.allowed_action_ids,
                    request.locale,
                )
                .to_string(),
                usage: None,
            }),
        }
    }
}

pub struct RemoteChat {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<SecretString>,
    model: String,
    timeout: Duration,
}

impl RemoteChat {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.chat_base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
            timeout: config.chat_timeout,
        }
    }

    #[tracing::instrument(skip(self, request), fields(model = %self.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatCompletion> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            AppError::ConfigurationError("A2ACTION_CHAT_BASE_URL is not configured.".into())
        })?;
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            AppError::ConfigurationError("A2ACTION_API_KEY is not configured.".into())
        })?;

        let payload = CompletionRequest {
            model: &self.model,
            messages: request.messages,
            temperature: request.temperature,
        };

        let call = async {
            let response = self
                .client
                .post(format!("{}/chat/completions", base_url))
                .header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()))
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json")
                .json(&payload)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::ProviderError(format!(
                    "Provider error {}: {}",
                    status.as_u16(),
                    truncate_chars(&body, MAX_ERROR_BODY)
                )));
            }

            let body: Value = response.json().await?;
            extract_completion(body)
        };

        // One deadline covers connect, headers and body.
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| AppError::DeadlineExceeded("Chat provider timeout".into()))?
    }
}

fn extract_completion(mut body: Value) -> Result<ChatCompletion> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::ProviderError(
                "Provider response missing choices[0].message.content".into(),
            )
        })?;

    let usage = body
        .get_mut("usage")
        .map(Value::take)
        .filter(|u| !u.is_null());

    Ok(ChatCompletion { content, usage })
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}
