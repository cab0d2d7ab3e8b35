//! Pipeline endpoints.
//!
//! Each sub-module owns one stage of the run lifecycle. Shared error types
//! and the lazy analysis step live here.

mod analyzer;
mod collector;
mod health;
mod mapper;
mod reporter;
mod runs;
mod summarizer;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use netsoc_detect::summary::AlertSummary;
use netsoc_detect::{build_timeline, generate_alerts_with_iocs, TimelineError};

use crate::state::{Analysis, AppState, RunId};

// ── Shared types ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(crate) fn no_logs_loaded() -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "No logs loaded")
}

/// Decode a JSON body that may be omitted entirely.
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("invalid request: {e}")))
}

// ── Analysis ─────────────────────────────────────────────────────

/// Detection and correlation for the current run, computed once and cached
/// on the run record.
pub(crate) async fn ensure_analysis(state: &AppState) -> Result<(RunId, Analysis), ApiError> {
    let (run_id, events) = {
        let runs = state.runs.read().await;
        let run = runs.current().ok_or_else(no_logs_loaded)?;
        if let Some(analysis) = &run.analysis {
            return Ok((run.run_id, analysis.clone()));
        }
        (run.run_id, Arc::clone(&run.events))
    };

    let detection = state.config.detection.clone();
    let iocs = state.iocs.clone();
    let analysis = tokio::task::spawn_blocking(move || -> Result<Analysis, TimelineError> {
        let alerts = generate_alerts_with_iocs(&events, &detection, iocs.as_deref());
        let episodes = build_timeline(&alerts, detection.gap_seconds)?;
        Ok(Analysis {
            summary: AlertSummary::from_alerts(&alerts),
            alerts,
            episodes,
        })
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    info!(
        run = %run_id,
        alerts = analysis.alerts.len(),
        episodes = analysis.episodes.len(),
        "run analyzed"
    );

    if let Some(run) = state.runs.write().await.get_mut(&run_id) {
        run.analysis = Some(analysis.clone());
    }
    Ok((run_id, analysis))
}

// ── Re-exports ───────────────────────────────────────────────────

pub use analyzer::analyzer;
pub use collector::collector;
pub use health::health;
pub use mapper::mapper;
pub use reporter::reporter;
pub use runs::run_by_id;
pub use summarizer::summarizer;
