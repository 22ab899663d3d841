//! Tool selector: ranks client-permitted tools for one utterance.
//!
//! Three independent signals are fused with fixed weights:
//!
//! - **vector**: cosine similarity between the seed embedding and the tool's precomputed vector
//! - **context**: bonus when the tool is the one the client last used
//! - **heuristic**: bonuses for categorical matches (image attachment, `.m3u` link)
//!
//! Scoring is synchronous and CPU only. The one async step, embedding the
//! seed, degrades to "no query vector" on any failure instead of aborting.

use super::context::SelectionContext;
use super::similarity::cosine_similarity;
use crate::embedding::{Embedder, Embedding, TextType};
use crate::persistence::VectorStore;
use crate::registry::{ToolDefinition, ToolRegistry, SIGNAL_IMAGE, SIGNAL_URL_M3U};
use serde::Serialize;
use std::collections::HashSet;

pub const VECTOR_WEIGHT: f32 = 0.75;
pub const CONTEXT_WEIGHT: f32 = 0.15;
pub const HEURISTIC_WEIGHT: f32 = 0.10;

/// Context bonus for the client's last-active tool.
pub const CONTEXT_ACTIVE_SCORE: f32 = 3.0;
/// Heuristic bonus for image tools when an image is attached.
pub const HEURISTIC_IMAGE_SCORE: f32 = 3.0;
/// Heuristic bonus for playlist tools when the seed mentions `.m3u`/`.m3u8`.
pub const HEURISTIC_M3U_SCORE: f32 = 10.0;

/// Raw, unweighted signal values behind a fused score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SignalScores {
    pub vector: f32,
    pub context: f32,
    pub heuristic: f32,
}

impl SignalScores {
    pub fn fused(&self) -> f32 {
        self.vector * VECTOR_WEIGHT
            + self.context * CONTEXT_WEIGHT
            + self.heuristic * HEURISTIC_WEIGHT
    }

    /// `context+heuristic+vector`, listing only strictly positive signals.
    pub fn reason(&self) -> Option<String> {
        let parts: Vec<&str> = [
            (self.context, "context"),
            (self.heuristic, "heuristic"),
            (self.vector, "vector"),
        ]
        .into_iter()
        .filter(|(score, _)| *score > 0.0)
        .map(|(_, label)| label)
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("+"))
        }
    }
}

/// A candidate tool with its fused score. Only meaningful for ordering.
#[derive(Debug, Clone)]
pub struct ScoredTool<'a> {
    pub id: String,
    pub score: f32,
    pub def: &'a ToolDefinition,
    pub signals: SignalScores,
    pub reason: Option<String>,
}

impl<'a> ScoredTool<'a> {
    /// Unranked entry, as rendered for legacy prompts.
    pub fn unscored(id: impl Into<String>, def: &'a ToolDefinition) -> Self {
        Self {
            id: id.into(),
            score: 0.0,
            def,
            signals: SignalScores::default(),
            reason: None,
        }
    }
}

pub struct ToolSelector<'a> {
    registry: &'a ToolRegistry,
    vectors: &'a VectorStore,
    embedder: &'a dyn Embedder,
}

impl<'a> ToolSelector<'a> {
    pub fn new(
        registry: &'a ToolRegistry,
        vectors: &'a VectorStore,
        embedder: &'a dyn Embedder,
    ) -> Self {
        Self {
            registry,
            vectors,
            embedder,
        }
    }

    /// Rank the client's permitted tools for `seed`, best first.
    ///
    /// Unknown capability ids are dropped silently. An empty candidate set
    /// returns immediately without embedding anything.
    #[tracing::instrument(skip(self, seed, context), fields(seed_len = seed.len()))]
    pub async fn select(&self, seed: &str, context: &SelectionContext) -> Vec<ScoredTool<'a>> {
        let candidates = self.candidates(context);
        if candidates.is_empty() {
            return Vec::new();
        }

        let seed = seed.trim();
        let query = if seed.is_empty() {
            None
        } else {
            match self.embedder.embed(seed, TextType::Query).await {
                Ok(vec) => Some(vec),
                Err(e) => {
                    tracing::warn!(error = %e, "Seed embedding failed, scoring without vectors");
                    metrics::counter!("embedding_failures_total").increment(1);
                    None
                }
            }
        };

        let ranked = score_candidates(
            &candidates,
            query.as_ref(),
            self.vectors.load(),
            seed,
            context,
        );

        tracing::debug!(
            candidates = ranked.len(),
            top = ?ranked.iter().take(5).map(|t| format!("{}:{:.2}", t.id, t.score)).collect::<Vec<_>>(),
            "Tool selection completed"
        );
        metrics::histogram!("tool_selection_candidates").record(ranked.len() as f64);

        ranked
    }

    /// Permitted ids that exist in the registry, in client order, each once.
    pub fn candidates(&self, context: &SelectionContext) -> Vec<(&'a str, &'a ToolDefinition)> {
        let mut seen = HashSet::new();
        context
            .client_capability_ids
            .iter()
            .filter_map(|id| self.registry.entry(id))
            .filter(|(id, _)| seen.insert(*id))
            .collect()
    }
}

/// Score and rank candidates. Ties keep candidate order.
pub fn score_candidates<'a>(
    candidates: &[(&str, &'a ToolDefinition)],
    query: Option<&Embedding>,
    vectors: &crate::persistence::ToolVectorIndex,
    seed: &str,
    context: &SelectionContext,
) -> Vec<ScoredTool<'a>> {
    let image_boost = context.has_image_attachment();
    let m3u_boost = looks_like_m3u(seed);
    let last_active = context
        .last_active_tool_id
        .as_deref()
        .map(str::trim)
        .unwrap_or("");

    let mut scored: Vec<ScoredTool<'a>> = candidates
        .iter()
        .map(|&(id, def)| {
            let vector = match (query, vectors.get(id)) {
                (Some(q), Some(v)) => cosine_similarity(q, v),
                _ => 0.0,
            };

            let context_score = if !last_active.is_empty() && id == last_active {
                CONTEXT_ACTIVE_SCORE
            } else {
                0.0
            };

            let mut heuristic = 0.0;
            if image_boost && def.has_signal(SIGNAL_IMAGE) {
                heuristic += HEURISTIC_IMAGE_SCORE;
            }
            if m3u_boost && def.has_signal(SIGNAL_URL_M3U) {
                heuristic += HEURISTIC_M3U_SCORE;
            }

            let signals = SignalScores {
                vector,
                context: context_score,
                heuristic,
            };

            ScoredTool {
                id: id.to_string(),
                score: signals.fused(),
                def,
                signals,
                reason: signals.reason(),
            }
        })
        .collect();

    // sort_by is stable, so equal scores keep candidate order.
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}

fn looks_like_m3u(seed: &str) -> bool {
    seed.trim().to_lowercase().contains(".m3u")
}
