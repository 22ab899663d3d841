//! Remote embedding service client.
//!
//! Speaks the DashScope-style text embedding protocol:
//! request `{model, input: {texts: [..]}, parameters: {text_type}}`,
//! response `output.embeddings[0].embedding`. Returned vectors are used
//! verbatim and are not re-normalized.

use super::{Embedder, Embedding, TextType};
use crate::config::Config;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

/// Maximum characters of an error body carried into `ProviderError`.
const MAX_ERROR_BODY: usize = 400;

pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<SecretString>,
    model: String,
    timeout: Duration,
}

impl RemoteEmbedder {
    /// Missing credentials are not rejected here; every `embed` call reports
    /// them as a `ConfigurationError` so a misconfigured service still starts.
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.embeddings_url.clone(),
            api_key: config.api_key.clone(),
            model: config.embeddings_model.clone(),
            timeout: config.embeddings_timeout,
        }
    }

    fn credentials(&self) -> Result<(&str, &SecretString)> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            AppError::ConfigurationError("Missing A2ACTION_API_KEY for embeddings".into())
        })?;
        let endpoint = self.endpoint.as_deref().ok_or_else(|| {
            AppError::ConfigurationError("A2ACTION_EMBEDDINGS_URL is not configured".into())
        })?;
        Ok((endpoint, api_key))
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    #[tracing::instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed(&self, text: &str, text_type: TextType) -> Result<Embedding> {
        let (endpoint, api_key) = self.credentials()?;

        let request = EmbeddingRequest {
            model: &self.model,
            input: EmbeddingInput { texts: [text] },
            parameters: EmbeddingParameters {
                text_type: text_type.as_str(),
            },
        };

        let response = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderError(format!(
                "Embeddings error {}: {}",
                status.as_u16(),
                truncate_chars(&body, MAX_ERROR_BODY)
            )));
        }

        let body: serde_json::Value = response.json().await?;
        extract_embedding(&body)
    }
}

/// Pull `output.embeddings[0].embedding` out of a response body.
fn extract_embedding(body: &serde_json::Value) -> Result<Embedding> {
    let values = body
        .pointer("/output/embeddings/0/embedding")
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            AppError::ProviderError(
                "Embeddings response missing output.embeddings[0].embedding".into(),
            )
        })?;

    values
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                AppError::ProviderError("Embeddings response contains a non-numeric value".into())
            })
        })
        .collect()
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
    parameters: EmbeddingParameters,
}

#[derive(Serialize)]
struct EmbeddingInput<'a> {
    texts: [&'a str; 1],
}

#[derive(Serialize)]
struct EmbeddingParameters {
    text_type: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_api_key_is_configuration_error() {
        let config = Config {
            embeddings_url: Some("http://127.0.0.1:9/embeddings".into()),
            ..Config::default()
        };
        let embedder = RemoteEmbedder::from_config(&config);

        let result = embedder.embed("hello", TextType::Query).await;
        assert!(matches!(result, Err(AppError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_configuration_error() {
        let config = Config {
            api_key: Some(SecretString::from("key".to_string())),
            ..Config::default()
        };
        let embedder = RemoteEmbedder::from_config(&config);

        let result = embedder.embed("hello", TextType::Query).await;
        match result {
            Err(AppError::ConfigurationError(msg)) => assert!(msg.contains("EMBEDDINGS_URL")),
            other => panic!("expected configuration error, got {:?}", other.map(|v| v.len())),
        }
    }

    #[tokio::test]
    async fn test_unresponsive_service_is_deadline_exceeded() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = Config {
            embeddings_url: Some(format!("http://{}/embeddings", addr)),
            api_key: Some(SecretString::from("key".to_string())),
            embeddings_timeout: Duration::from_millis(200),
            ..Config::default()
        };
        let embedder = RemoteEmbedder::from_config(&config);

        let result = embedder.embed("hello", TextType::Query).await;
        assert!(
            matches!(result, Err(AppError::DeadlineExceeded(_))),
            "expected deadline exceeded, got {:?}",
            result.map(|v| v.len())
        );
    }

    #[test]
    fn test_extract_embedding_verbatim() {
        let body = json!({"output": {"embeddings": [{"embedding": [3.0, 4.0]}]}});
        // Not normalized: remote vectors are used as returned.
        assert_eq!(extract_embedding(&body).unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_extract_embedding_missing_field() {
        let body = json!({"output": {"embeddings": []}});
        assert!(matches!(
            extract_embedding(&body),
            Err(AppError::ProviderError(_))
        ));
    }

    #[test]
    fn test_extract_embedding_non_numeric() {
        let body = json!({"output": {"embeddings": [{"embedding": [1.0, "x"]}]}});
        assert!(extract_embedding(&body).is_err());
    }

    #[test]
    fn test_request_shape() {
        let request = EmbeddingRequest {
            model: "text-embedding-v4",
            input: EmbeddingInput { texts: ["hi"] },
            parameters: EmbeddingParameters {
                text_type: TextType::Document.as_str(),
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "text-embedding-v4",
                "input": {"texts": ["hi"]},
                "parameters": {"text_type": "document"}
            })
        );
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
