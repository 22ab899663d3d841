use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness report: what the router will rank against right now.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: &'static str,
    pub tools: usize,
    /// Tools with a precomputed vector. Fewer than `tools` means a stale asset.
    pub vectors: usize,
    pub registry_fingerprint: String,
    pub chat_provider: &'static str,
}

/// GET /health - Liveness check
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /ready - Registry loaded and vector asset warmed
pub async fn ready_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadyResponse>) {
    let ready = state.is_ready();
    // Report only; never trigger the vector file read here.
    let vectors = if state.vectors.is_loaded() {
        let index = state.vectors.load();
        state
            .registry
            .iter()
            .filter(|(id, _)| index.contains_key(*id))
            .count()
    } else {
        0
    };

    let body = ReadyResponse {
        status: if ready { "ready" } else { "not_ready" },
        tools: state.registry.len(),
        vectors,
        registry_fingerprint: state.registry_fingerprint.clone(),
        chat_provider: state.chat.name(),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
