//! Telemetry loading and reference-corpus extraction.
//!
//! - `loader`: Zeek TSV, JSON container and NDJSON exports to `EventRecord`s
//! - `stats`: dataset statistics for the collector
//! - `corpus` / `document`: reference documents for the retrieval index
//! - `embedding`: embedding backends used to index the corpus

pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
mod flatten;
pub mod loader;
mod normalize;
pub mod stats;
mod timestamp;
mod zeek;

pub use corpus::{load_corpus, tactic_seeds, CorpusDocument};
pub use error::IngestError;
pub use loader::{
    load_events, load_events_limited, parse_events, resolve_within, LoadedDataset, SourceFormat,
};
pub use stats::DatasetStats;
