//! Snapshot publication and consumption for brand-pulse.
//!
//! The [`Publisher`] turns the current mention window into a snapshot file
//! via [`SnapshotStore`]'s atomic staging-and-rename write. The
//! [`SnapshotWatcher`] polls that file and serves the last good snapshot
//! from a lock-free [`SnapshotCache`].

pub mod error;
pub mod publisher;
pub mod store;
pub mod watcher;

pub use error::{ParseError, PublishError, WriteError};
pub use publisher::{Publisher, PublisherHealth, PublisherHealthView};
pub use store::{parse_snapshot, SnapshotStore};
pub use watcher::{
    PollOutcome, SnapshotCache, SnapshotWatcher, WatcherHealth, WatcherState, WatcherStatus,
};
