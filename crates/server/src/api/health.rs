use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::{AppState, RunId};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub corpus_documents: usize,
    pub llm_ready: bool,
    pub current_run: Option<RunId>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        corpus_documents: state.corpus_documents,
        llm_ready: state.provider.is_some(),
        current_run: state.runs.read().await.current_id(),
    })
}
