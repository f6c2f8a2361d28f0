//! Consumer-side change detection for the published snapshot file.
//!
//! Each poll compares cheap file metadata first, then a SHA-256 fingerprint of
//! the bytes, and only parses when the content actually changed. A snapshot is
//! swapped into the [`SnapshotCache`] only after it parses and validates; any
//! failure keeps the last good one and is retried on the next poll.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use pulse_collector::ShutdownSignal;
use pulse_core::Snapshot;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::time::MissedTickBehavior;

use crate::error::ParseError;
use crate::store::{parse_snapshot, read_bytes};

/// Lock-free holder of the last good snapshot.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: ArcSwapOption<Snapshot>,
}

impl SnapshotCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn load(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    fn store(&self, snapshot: Snapshot) {
        self.current.store(Some(Arc::new(snapshot)));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherState {
    /// Nothing valid has ever been loaded.
    NoData,
    Watching,
    /// The last poll failed; an older snapshot is still being served.
    Stale,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatcherHealth {
    pub state: WatcherState,
    pub has_loaded: bool,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl WatcherHealth {
    #[must_use]
    pub fn seconds_since_last_success(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_success_at.map(|at| (now - at).num_seconds().max(0))
    }
}

impl Default for WatcherHealth {
    fn default() -> Self {
        Self {
            state: WatcherState::NoData,
            has_loaded: false,
            last_success_at: None,
            last_error: None,
        }
    }
}

/// Shared, readable view of the watcher's health.
#[derive(Debug, Default)]
pub struct WatcherStatus {
    inner: RwLock<WatcherHealth>,
}

impl WatcherStatus {
    #[must_use]
    pub fn health(&self) -> WatcherHealth {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn state(&self) -> WatcherState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    fn update(&self, f: impl FnOnce(&mut WatcherHealth)) {
        f(&mut self.inner.write().unwrap_or_else(PoisonError::into_inner));
    }
}

/// Cheap change marker: size, modification time, and inode on unix (each
/// atomic publish renames a new file into place).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileMarker {
    len: u64,
    modified: Option<SystemTime>,
    inode: u64,
}

impl FileMarker {
    fn from_metadata(meta: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let inode = std::os::unix::fs::MetadataExt::ino(meta);
        #[cfg(not(unix))]
        let inode = 0;
        Self {
            len: meta.len(),
            modified: meta.modified().ok(),
            inode,
        }
    }
}

/// Result of a single [`SnapshotWatcher::poll`].
#[derive(Debug)]
pub enum PollOutcome {
    /// File metadata or content matches the cached snapshot.
    Unchanged,
    /// A new snapshot was parsed, validated, and swapped in.
    Loaded,
    /// Nothing could be loaded; the previous snapshot (if any) is kept.
    Failed(ParseError),
}

pub struct SnapshotWatcher {
    path: PathBuf,
    io_timeout: Duration,
    cache: Arc<SnapshotCache>,
    status: Arc<WatcherStatus>,
    marker: Option<FileMarker>,
    fingerprint: Option<[u8; 32]>,
}

impl SnapshotWatcher {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, io_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            io_timeout,
            cache: Arc::new(SnapshotCache::new()),
            status: Arc::new(WatcherStatus::default()),
            marker: None,
            fingerprint: None,
        }
    }

    #[must_use]
    pub fn cache(&self) -> Arc<SnapshotCache> {
        Arc::clone(&self.cache)
    }

    #[must_use]
    pub fn status(&self) -> Arc<WatcherStatus> {
        Arc::clone(&self.status)
    }

    /// Check the file once and reload it if it changed.
    pub async fn poll(&mut self) -> PollOutcome {
        match self.check().await {
            Ok(outcome) => {
                self.status.update(|h| {
                    h.state = WatcherState::Watching;
                    h.has_loaded = true;
                    h.last_success_at = Some(Utc::now());
                    h.last_error = None;
                });
                outcome
            }
            Err(e) => {
                let message = e.to_string();
                self.status.update(|h| {
                    if h.state != WatcherState::NoData {
                        h.state = WatcherState::Stale;
                    }
                    h.last_error = Some(message);
                });
                if matches!(e, ParseError::Missing { .. }) && self.marker.is_none() {
                    tracing::debug!(path = %self.path.display(), "snapshot not published yet");
                } else {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "snapshot poll failed; serving last good snapshot"
                    );
                }
                PollOutcome::Failed(e)
            }
        }
    }

    async fn check(&mut self) -> Result<PollOutcome, ParseError> {
        let meta = match tokio::time::timeout(self.io_timeout, tokio::fs::metadata(&self.path))
            .await
        {
            Ok(Ok(meta)) => meta,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ParseError::Missing {
                    path: self.path.display().to_string(),
                });
            }
            Ok(Err(e)) => {
                return Err(ParseError::Read {
                    path: self.path.display().to_string(),
                    source: e,
                });
            }
            Err(_) => {
                return Err(ParseError::Timeout {
                    path: self.path.display().to_string(),
                    after: self.io_timeout,
                });
            }
        };

        let marker = FileMarker::from_metadata(&meta);
        if self.marker == Some(marker) {
            return Ok(PollOutcome::Unchanged);
        }

        let bytes = read_bytes(&self.path, self.io_timeout).await?;
        let fingerprint: [u8; 32] = Sha256::digest(&bytes).into();
        if self.fingerprint == Some(fingerprint) {
            self.marker = Some(marker);
            return Ok(PollOutcome::Unchanged);
        }

        let snapshot = parse_snapshot(&bytes)?;
        tracing::info!(
            generated_at = %snapshot.generated_at,
            mentions = snapshot.mentions.len(),
            "loaded new snapshot"
        );
        self.cache.store(snapshot);
        self.marker = Some(marker);
        self.fingerprint = Some(fingerprint);
        Ok(PollOutcome::Loaded)
    }

    /// Poll every `interval` until shutdown, then enter [`WatcherState::Stopped`].
    pub async fn run(mut self, interval: Duration, mut shutdown: ShutdownSignal) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            path = %self.path.display(),
            interval_secs = interval.as_secs(),
            "snapshot watcher started"
        );

        loop {
            tokio::select! {
                () = shutdown.triggered() => break,
                _ = ticker.tick() => {
                    let _ = self.poll().await;
                }
            }
        }

        self.status.update(|h| h.state = WatcherState::Stopped);
        tracing::info!("snapshot watcher stopped");
    }
}

#[cfg(test)]
#[path = "watcher_test.rs"]
mod tests;
