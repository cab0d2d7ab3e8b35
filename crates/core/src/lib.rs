pub mod alert;
pub mod config;
pub mod episode;
pub mod error;
pub mod event;

pub use alert::{sanitize_description, Alert, AlertKind, MAX_DESCRIPTION_CHARS};
pub use config::{
    Config, DataConfig, DetectionConfig, EmbeddingConfig, LlmConfig, MapperConfig, OllamaConfig,
    ServerConfig, DEFAULT_MAX_LOG_BYTES,
};
pub use episode::{Episode, EpisodeBuilder, MappingFailure, TacticMapping, SUMMARY_SEPARATOR};
pub use error::*;
pub use event::*;
