use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::loader::{LoadedDataset, SourceFormat};

/// Collector statistics for one loaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub rows: usize,
    pub dropped_rows: usize,
    pub format: SourceFormat,
    pub synthetic_time: bool,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Event counts keyed by Zeek path name.
    pub event_types: BTreeMap<String, usize>,
    pub unique_sources: usize,
    pub unique_destinations: usize,
    pub columns: Vec<String>,
}

impl DatasetStats {
    pub fn compute(dataset: &LoadedDataset) -> Self {
        let events = &dataset.events;

        let mut event_types = BTreeMap::new();
        let mut sources = BTreeSet::new();
        let mut destinations = BTreeSet::new();
        for e in events {
            *event_types.entry(e.kind().as_str().to_string()).or_insert(0) += 1;
            sources.insert(e.source_host.as_str());
            destinations.insert(e.dest_host.as_str());
        }

        Self {
            rows: events.len(),
            dropped_rows: dataset.dropped,
            format: dataset.format,
            synthetic_time: dataset.synthetic_time,
            first_seen: events.first().map(|e| e.timestamp),
            last_seen: events.last().map(|e| e.timestamp),
            event_types,
            unique_sources: sources.len(),
            unique_destinations: destinations.len(),
            columns: dataset.columns.iter().cloned().collect(),
        }
    }
}
