//! Precompute tool vectors for the registry.
//!
//! Usage: `build-vectors [REGISTRY_PATH] [OUTPUT_PATH]`
//!
//! Paths default to `A2ACTION_REGISTRY_PATH` / `A2ACTION_VECTORS_PATH`. The
//! embedder is the same one the service uses, so the output dimension matches
//! what query embeddings will have at runtime.

use a2action::embedding::{self, TextType};
use a2action::persistence::{save_vectors, ToolVectorIndex};
use a2action::{Config, ToolRegistry};
use anyhow::Context;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "a2action=info,build_vectors=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let mut args = std::env::args().skip(1);
    let registry_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.registry_path.clone());
    let output_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.vectors_path.clone());

    let registry = ToolRegistry::load(&registry_path)
        .with_context(|| format!("loading registry {}", registry_path.display()))?;
    let embedder = embedding::from_config(&config);

    let mut ids: Vec<&String> = registry.iter().map(|(id, _)| id).collect();
    ids.sort();

    let mut vectors = ToolVectorIndex::new();
    let mut skipped = 0usize;

    for id in ids {
        let Some(def) = registry.get(id) else { continue };
        let text = def.embedding_text.trim();
        if text.is_empty() {
            tracing::warn!(tool = %id, "Empty embedding text, skipping");
            skipped += 1;
            continue;
        }

        let vector = embedder
            .embed(text, TextType::Document)
            .await
            .with_context(|| format!("embedding tool {}", id))?;
        vectors.insert(id.clone(), vector);
    }

    save_vectors(&output_path, &vectors)
        .with_context(|| format!("writing vectors {}", output_path.display()))?;

    tracing::info!(
        tools = vectors.len(),
        skipped,
        fingerprint = %registry.fingerprint(),
        output = %output_path.display(),
        "Tool vectors written"
    );

    Ok(())
}
