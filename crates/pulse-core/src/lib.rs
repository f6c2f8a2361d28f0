//! Shared domain types and configuration for the brand pulse pipeline.

mod app_config;
mod config;
mod error;
pub mod mention;
pub mod snapshot;
pub mod tracking;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use mention::{
    Cursor, Mention, MentionError, RatingScale, RawMention, Sentiment, SentimentCategory, Source,
};
pub use snapshot::{
    Distribution, PlatformBreakdown, Snapshot, SnapshotInvariantError, SnapshotMetrics, TermMetrics,
};
pub use tracking::{load_tracking, parse_tracking, SourceEndpoint, TrackingConfig};
