use thiserror::Error;

/// Startup configuration failures. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read tracking file {path}: {source}")]
    TrackingFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tracking file: {0}")]
    TrackingFileParse(#[from] serde_yaml::Error),

    #[error("invalid tracking configuration: {0}")]
    Validation(String),
}
