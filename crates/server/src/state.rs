//! Shared application state and the per-process run cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use netsoc_core::{Alert, Config, Episode, EventRecord, MappingFailure, TacticMapping};
use netsoc_detect::summary::AlertSummary;
use netsoc_detect::IocList;
use netsoc_ingest::DatasetStats;
use netsoc_llm::{LlmProvider, Retriever};

pub type RunId = Uuid;

pub struct AppState {
    pub config: Config,
    pub retriever: Arc<dyn Retriever>,
    /// `None` when no completion backend could be configured; the mapper and
    /// reporter endpoints answer 503 in that case.
    pub provider: Option<Arc<dyn LlmProvider>>,
    pub corpus_documents: usize,
    /// Loaded from `data.ioc_path` at startup when the file exists.
    pub iocs: Option<Arc<IocList>>,
    pub runs: RwLock<RunCache>,
}

/// Detection output for one run, computed lazily by the analyzer.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub alerts: Vec<Alert>,
    pub summary: AlertSummary,
    pub episodes: Vec<Episode>,
}

/// Everything known about one ingested dataset.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub stats: DatasetStats,
    #[serde(skip)]
    pub events: Arc<Vec<EventRecord>>,
    pub analysis: Option<Analysis>,
    /// Successful mappings keyed by episode start.
    pub mappings: BTreeMap<DateTime<Utc>, TacticMapping>,
    pub failed: Vec<MappingFailure>,
}

impl RunRecord {
    pub fn new(source: impl Into<String>, stats: DatasetStats, events: Vec<EventRecord>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source: source.into(),
            loaded_at: Utc::now(),
            stats,
            events: Arc::new(events),
            analysis: None,
            mappings: BTreeMap::new(),
            failed: Vec::new(),
        }
    }
}

/// Runs cached for the lifetime of the process. Starting a run evicts every
/// earlier one, so cached alerts and mappings never outlive their dataset.
#[derive(Debug, Default)]
pub struct RunCache {
    current: Option<RunId>,
    runs: HashMap<RunId, RunRecord>,
}

impl RunCache {
    pub fn start(&mut self, record: RunRecord) -> RunId {
        let id = record.run_id;
        self.runs.clear();
        self.runs.insert(id, record);
        self.current = Some(id);
        id
    }

    pub fn current_id(&self) -> Option<RunId> {
        self.current
    }

    pub fn current(&self) -> Option<&RunRecord> {
        self.current.and_then(|id| self.runs.get(&id))
    }

    pub fn get(&self, id: &RunId) -> Option<&RunRecord> {
        self.runs.get(id)
    }

    pub fn get_mut(&mut self, id: &RunId) -> Option<&mut RunRecord> {
        self.runs.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }
}
