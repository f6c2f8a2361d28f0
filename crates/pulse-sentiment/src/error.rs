use pulse_core::{MentionError, Source};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("invalid mention {platform}/{id}: {reason}")]
    InvalidMention {
        platform: Source,
        id: String,
        #[source]
        reason: MentionError,
    },
}
