use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log file not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("Log file {path} is {size} bytes, limit is {limit}")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Path escapes the data directory: {0}")]
    OutsideDataDir(PathBuf),

    #[error("Zeek log line {line}: {message}")]
    Zeek { line: usize, message: String },

    #[error("No records found in {0}")]
    Empty(String),
}
