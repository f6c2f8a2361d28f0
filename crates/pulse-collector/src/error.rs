use std::time::Duration;

use thiserror::Error;

/// Retry class of a [`CollectionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    RateLimited,
    Auth,
}

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("malformed feed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("collect call timed out after {0:?}")]
    Timeout(Duration),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("authentication rejected: {0}")]
    Auth(String),
}

impl CollectionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Http(_)
            | Self::UnexpectedStatus { .. }
            | Self::MalformedResponse { .. }
            | Self::Timeout(_)
            | Self::Transient(_) => ErrorKind::Transient,
        }
    }

    /// Server-provided minimum wait, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("archive serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("archive write to {path} timed out after {after:?}")]
    Timeout { path: String, after: Duration },
}
