use std::time::Duration;

use pulse_core::SnapshotInvariantError;
use pulse_sentiment::AggregationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("snapshot serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot write to {path} timed out after {after:?}")]
    Timeout { path: String, after: Duration },

    #[error("invalid snapshot path {0}: needs a file name")]
    InvalidPath(String),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("snapshot file {path} not found")]
    Missing { path: String },

    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("reading snapshot {path} timed out after {after:?}")]
    Timeout { path: String, after: Duration },

    #[error("malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot violates invariant: {0}")]
    Invariant(#[from] SnapshotInvariantError),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("write failed: {0}")]
    Write(#[from] WriteError),
}
