use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use netsoc_core::{MappingFailure, TacticMapping};
use netsoc_llm::TacticMapper;

use crate::state::{AppState, RunId};

use super::{api_error, ensure_analysis, ApiError};

#[derive(Serialize)]
pub struct MapperResponse {
    pub run_id: RunId,
    pub mapped: Vec<TacticMapping>,
    pub failed: Vec<MappingFailure>,
}

pub async fn mapper(State(state): State<Arc<AppState>>) -> Result<Json<MapperResponse>, ApiError> {
    let provider = state.provider.clone().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "LLM provider not configured. Set LLM_PROVIDER and API keys.",
        )
    })?;
    let (run_id, analysis) = ensure_analysis(&state).await?;

    let result = TacticMapper::new(state.retriever.clone(), provider, &state.config.mapper)
        .map_all(&analysis.episodes)
        .await;

    // The run may have been replaced while the provider was working.
    if let Some(run) = state.runs.write().await.get_mut(&run_id) {
        run.mappings.extend(result.by_start());
        run.failed = result.failed.clone();
    }

    info!(run = %run_id, mapped = result.mapped.len(), failed = result.failed.len(), "run mapped");
    Ok(Json(MapperResponse {
        run_id,
        mapped: result.mapped,
        failed: result.failed,
    }))
}
