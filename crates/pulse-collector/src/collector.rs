//! The per-source collection contract.

use async_trait::async_trait;
use pulse_core::{Cursor, RawMention, Source};

use crate::error::CollectionError;

/// One page of collection results.
#[derive(Debug, Clone, Default)]
pub struct CollectBatch {
    pub mentions: Vec<RawMention>,
    /// Cursor to pass on the next call; `None` when the feed has no more.
    pub next_cursor: Option<Cursor>,
}

/// Retrieves new mentions from one external source.
///
/// Implementations own their client and credentials. They never classify:
/// [`RawMention`] has no sentiment field.
#[async_trait]
pub trait Collector: Send + Sync {
    fn source(&self) -> Source;

    /// Fetch the next page after `since` (or the newest page when `None`).
    async fn collect(&self, since: Option<&Cursor>) -> Result<CollectBatch, CollectionError>;
}
