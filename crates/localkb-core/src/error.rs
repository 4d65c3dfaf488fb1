use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KbError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record in {path} at line {line}: {source}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{store} is misaligned with the chunk list: expected {expected} rows, found {actual}")]
    Misaligned {
        store: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corrupt vector index: {0}")]
    CorruptIndex(String),

    #[error("Encoder failed: {0}")]
    Encoder(#[source] anyhow::Error),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl KbError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, KbError>;
