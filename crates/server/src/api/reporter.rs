use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use netsoc_core::TacticMapping;
use netsoc_llm::explain_tactic;

use crate::state::AppState;

use super::{api_error, no_logs_loaded, ApiError};

#[derive(Deserialize)]
pub struct ReportRequest {
    pub tactic: String,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub tactic: String,
    pub episodes: usize,
    pub report: String,
}

pub async fn reporter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let tactic = req.tactic.trim().to_string();
    if tactic.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "tactic must not be empty"));
    }
    let provider = state.provider.clone().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "LLM provider not configured. Set LLM_PROVIDER and API keys.",
        )
    })?;

    let mappings: Vec<TacticMapping> = {
        let runs = state.runs.read().await;
        let run = runs.current().ok_or_else(no_logs_loaded)?;
        run.mappings.values().cloned().collect()
    };
    if mappings.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "No tactic mappings yet. POST /mapper first.",
        ));
    }

    let report = explain_tactic(
        &tactic,
        &mappings,
        state.retriever.as_ref(),
        provider.as_ref(),
        &state.config.mapper,
    )
    .await
    .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e.to_string()))?;

    Ok(Json(ReportResponse {
        tactic,
        episodes: mappings.len(),
        report,
    }))
}
