use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use netsoc_llm::summarizer::SummaryStats;
use netsoc_llm::{summarize_events, SummarizerError, DEFAULT_EVENT_FILTER};

use crate::state::{AppState, RunId};

use super::{api_error, no_logs_loaded, optional_json, ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct SummarizeRequest {
    /// Zeek log family to summarize; `dhcp` when omitted.
    #[serde(default)]
    pub event_filter: Option<String>,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    pub status: &'static str,
    pub run_id: RunId,
    pub event_filter: String,
    pub stats: SummaryStats,
    pub summary: String,
}

pub async fn summarizer(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let req: SummarizeRequest = optional_json(&body)?;
    let filter = req
        .event_filter
        .unwrap_or_else(|| DEFAULT_EVENT_FILTER.to_string());

    let provider = state.provider.clone().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "LLM provider not configured. Set LLM_PROVIDER and API keys.",
        )
    })?;
    let (run_id, events) = {
        let runs = state.runs.read().await;
        let run = runs.current().ok_or_else(no_logs_loaded)?;
        (run.run_id, Arc::clone(&run.events))
    };

    let out = summarize_events(&events, &filter, provider.as_ref(), &state.config.mapper)
        .await
        .map_err(|e| {
            let status = match &e {
                SummarizerError::UnknownFilter(_) => StatusCode::BAD_REQUEST,
                SummarizerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                SummarizerError::Completion(_) => StatusCode::BAD_GATEWAY,
            };
            api_error(status, e.to_string())
        })?;

    Ok(Json(SummarizeResponse {
        status: "ok",
        run_id,
        event_filter: out.event_filter,
        stats: out.stats,
        summary: out.summary,
    }))
}
