//! Embedding providers: text in, fixed-length vector out.
//!
//! Two interchangeable strategies sit behind the [`Embedder`] trait:
//! [`LocalEmbedder`] (deterministic hashing, default) and [`RemoteEmbedder`]
//! (HTTP embedding service). [`from_config`] picks one from the runtime switch.

pub mod local;
pub mod remote;

pub use local::LocalEmbedder;
pub use remote::RemoteEmbedder;

use crate::config::{Config, EmbeddingsProviderKind};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A dense embedding. Local vectors are unit length; remote ones are not guaranteed to be.
pub type Embedding = Vec<f32>;

/// Which side of retrieval the text is on. Remote services may embed them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextType {
    Query,
    Document,
}

impl TextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Document => "document",
        }
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// # Errors
    /// `ConfigurationError` when a remote strategy lacks credentials or endpoint,
    /// `ProviderError` on a failed or malformed remote response,
    /// `DeadlineExceeded` when the remote call times out.
    async fn embed(&self, text: &str, text_type: TextType) -> Result<Embedding>;
}

/// Build the embedder selected by `A2ACTION_EMBEDDINGS_PROVIDER`.
pub fn from_config(config: &Config) -> Arc<dyn Embedder> {
    match config.embeddings_provider {
        EmbeddingsProviderKind::Local => Arc::new(LocalEmbedder::new(config.embedding_dim)),
        EmbeddingsProviderKind::Remote => Arc::new(RemoteEmbedder::from_config(config)),
    }
}
