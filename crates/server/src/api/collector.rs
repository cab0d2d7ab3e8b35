//! Dataset ingestion. Each successful load starts a fresh run.

use std::path::Path;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use netsoc_ingest::{load_events_limited, resolve_within, DatasetStats, IngestError};

use crate::state::{AppState, RunId, RunRecord};

use super::{api_error, optional_json, ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct CollectRequest {
    /// Relative to the directory of `data.log_path`; defaults to that file.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Serialize)]
pub struct CollectResponse {
    pub run_id: RunId,
    pub stats: DatasetStats,
}

pub async fn collector(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CollectResponse>, ApiError> {
    let req: CollectRequest = optional_json(&body)?;

    let data = state.config.data.clone();
    let (path, dataset) = tokio::task::spawn_blocking(move || {
        // Client paths are confined to the directory holding the default export.
        let path = match req.path {
            Some(requested) => resolve_within(data.log_dir(), Path::new(&requested))?,
            None => data.log_path.clone(),
        };
        let dataset = load_events_limited(&path, data.max_log_bytes)?;
        Ok::<_, IngestError>((path, dataset))
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| {
        let status = match &e {
            IngestError::NotFound(_) => StatusCode::NOT_FOUND,
            IngestError::OutsideDataDir(_) => StatusCode::FORBIDDEN,
            IngestError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        api_error(status, e.to_string())
    })?;

    let stats = dataset.stats();
    let record = RunRecord::new(path.display().to_string(), stats.clone(), dataset.events);
    let run_id = state.runs.write().await.start(record);

    info!(run = %run_id, path = %path.display(), rows = stats.rows, "new run started");
    Ok(Json(CollectResponse { run_id, stats }))
}
