//! Multi-source mention collection for brand-pulse.
//!
//! Each [`Collector`] runs in its own task under a [`SourceRunner`], which
//! pages within a time budget, backs off on failure, and feeds validated raw
//! mentions into the shared [`MentionPool`].

pub mod archive;
pub mod backoff;
pub mod collector;
pub mod error;
pub mod harness;
pub mod http_feed;
pub mod pool;
pub mod shutdown;
pub mod status;

pub use archive::RunArchive;
pub use backoff::BackoffPolicy;
pub use collector::{CollectBatch, Collector};
pub use error::{ArchiveError, CollectionError, ErrorKind};
pub use harness::{
    spawn_collectors, CollectorState, CycleReport, HarnessContext, HarnessSettings, SourceRunner,
};
pub use http_feed::HttpFeedCollector;
pub use pool::MentionPool;
pub use shutdown::{Shutdown, ShutdownSignal};
pub use status::{SourceHealth, SourceStatus, SourceStatusBoard};
