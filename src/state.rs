use crate::config::Config;
use crate::embedding::{self, Embedder};
use crate::error::Result;
use crate::persistence::VectorStore;
use crate::provider::ChatProvider;
use crate::registry::ToolRegistry;
use crate::selection::ToolSelector;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Application state shared across all request handlers.
///
/// Everything here is read-only after construction except the vector store,
/// which fills itself once on first access.
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ToolRegistry>,
    /// Computed once at startup; see [`ToolRegistry::fingerprint`].
    pub registry_fingerprint: String,
    pub vectors: Arc<VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub chat: Arc<ChatProvider>,
    /// Flag indicating the service is ready (registry and vectors loaded)
    pub ready: AtomicBool,
}

impl AppState {
    /// Initialize application state from configured asset paths.
    ///
    /// A missing or invalid registry fails startup. Missing vectors do not:
    /// selection still works on context and heuristic signals.
    pub fn new(config: Config) -> Result<Self> {
        let registry = ToolRegistry::load(&config.registry_path)?;
        let vectors = VectorStore::new(config.vectors_path.clone());
        Ok(Self::from_parts(config, registry, vectors))
    }

    /// Assemble state from already-loaded parts and warm it up.
    pub fn from_parts(config: Config, registry: ToolRegistry, vectors: VectorStore) -> Self {
        let embedder = embedding::from_config(&config);
        let chat = ChatProvider::from_config(&config);

        tracing::info!(
            embeddings_provider = ?config.embeddings_provider,
            embedding_dim = config.embedding_dim,
            chat_provider = chat.name(),
            tools = registry.len(),
            "Application state assembled"
        );

        let state = Self {
            config: Arc::new(config),
            registry_fingerprint: registry.fingerprint(),
            registry: Arc::new(registry),
            vectors: Arc::new(vectors),
            embedder,
            chat: Arc::new(chat),
            ready: AtomicBool::new(false),
        };

        state.warmup();
        state.ready.store(true, Ordering::SeqCst);

        state
    }

    /// Load the vector asset now so the first request does no file I/O.
    fn warmup(&self) {
        let vectors = self.vectors.load();

        let missing: Vec<&String> = self
            .registry
            .iter()
            .filter(|(id, def)| !def.embedding_text.trim().is_empty() && !vectors.contains_key(*id))
            .map(|(id, _)| id)
            .collect();

        if !missing.is_empty() {
            tracing::warn!(
                missing = missing.len(),
                "Some registry tools have no precomputed vector; rebuild with build-vectors"
            );
        }
    }

    pub fn selector(&self) -> ToolSelector<'_> {
        ToolSelector::new(&self.registry, &self.vectors, self.embedder.as_ref())
    }

    /// Check if the service is ready to handle requests.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
