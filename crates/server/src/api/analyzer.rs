use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;

use netsoc_core::{Alert, Episode};
use netsoc_detect::summary::AlertSummary;
use netsoc_detect::technique;

use crate::state::{AppState, RunId};

use super::{ensure_analysis, ApiError};

/// Keyword technique hints for one episode, distinct and in member order.
#[derive(Serialize)]
pub struct TechniqueHints {
    pub episode_start: DateTime<Utc>,
    pub hints: Vec<String>,
}

#[derive(Serialize)]
pub struct AnalyzerResponse {
    pub status: &'static str,
    pub run_id: RunId,
    pub summary: AlertSummary,
    pub alerts: Vec<Alert>,
    pub episodes: Vec<Episode>,
    pub techniques: Vec<TechniqueHints>,
}

pub(crate) fn technique_hints(episode: &Episode) -> TechniqueHints {
    let hints: IndexSet<String> = episode
        .members
        .iter()
        .map(|a| technique::label(a.description()))
        .collect();
    TechniqueHints {
        episode_start: episode.start,
        hints: hints.into_iter().collect(),
    }
}

pub async fn analyzer(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyzerResponse>, ApiError> {
    let (run_id, analysis) = ensure_analysis(&state).await?;
    let techniques = analysis.episodes.iter().map(technique_hints).collect();

    Ok(Json(AnalyzerResponse {
        status: "ok",
        run_id,
        summary: analysis.summary,
        alerts: analysis.alerts,
        episodes: analysis.episodes,
        techniques,
    }))
}
