//! Periodic snapshot publication.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use pulse_collector::{MentionPool, ShutdownSignal};
use pulse_core::Snapshot;
use pulse_sentiment::{aggregate, AggregateOptions};
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::PublishError;
use crate::store::SnapshotStore;

/// Fail-soft counters for the publish loop.
#[derive(Debug, Default)]
pub struct PublisherHealth {
    consecutive_failures: AtomicU32,
    published: AtomicU64,
    last: RwLock<LastOutcome>,
}

#[derive(Debug, Default, Clone)]
struct LastOutcome {
    success_at: Option<DateTime<Utc>>,
    generated_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

/// Point-in-time copy of [`PublisherHealth`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublisherHealthView {
    pub consecutive_failures: u32,
    pub published: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_generated_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl PublisherHealth {
    fn record_success(&self, generated_at: DateTime<Utc>) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.published.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last.write().unwrap_or_else(PoisonError::into_inner);
        last.success_at = Some(Utc::now());
        last.generated_at = Some(generated_at);
        last.error = None;
    }

    fn record_failure(&self, error: &PublishError) -> u32 {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        self.last
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .error = Some(error.to_string());
        failures
    }

    #[must_use]
    pub fn view(&self) -> PublisherHealthView {
        let last = self
            .last
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        PublisherHealthView {
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            last_success_at: last.success_at,
            last_generated_at: last.generated_at,
            last_error: last.error,
        }
    }
}

/// Aggregates the current window and writes it through a [`SnapshotStore`].
#[derive(Debug)]
pub struct Publisher {
    pool: Arc<MentionPool>,
    store: SnapshotStore,
    options: AggregateOptions,
    interval: Duration,
    health: Arc<PublisherHealth>,
}

impl Publisher {
    #[must_use]
    pub fn new(
        pool: Arc<MentionPool>,
        store: SnapshotStore,
        options: AggregateOptions,
        interval: Duration,
    ) -> Self {
        Self {
            pool,
            store,
            options,
            interval,
            health: Arc::new(PublisherHealth::default()),
        }
    }

    #[must_use]
    pub fn health(&self) -> Arc<PublisherHealth> {
        Arc::clone(&self.health)
    }

    #[must_use]
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// One publish cycle. On failure the previous snapshot file is untouched
    /// and the failure is counted in [`PublisherHealth`].
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if aggregation or the write fails.
    pub async fn publish_once(&self) -> Result<Snapshot, PublishError> {
        let result = self.try_publish().await;
        match &result {
            Ok(snapshot) => {
                self.health.record_success(snapshot.generated_at);
                tracing::info!(
                    mentions = snapshot.mentions.len(),
                    positive = snapshot.distribution.positive,
                    negative = snapshot.distribution.negative,
                    neutral = snapshot.distribution.neutral,
                    no_data = snapshot.no_data,
                    "snapshot published"
                );
            }
            Err(e @ PublishError::Aggregation(_)) => {
                let failures = self.health.record_failure(e);
                tracing::warn!(error = %e, failures, "publish cycle aborted; previous snapshot kept");
            }
            Err(e @ PublishError::Write(_)) => {
                let failures = self.health.record_failure(e);
                tracing::error!(error = %e, failures, "snapshot write failed; previous snapshot kept");
            }
        }
        result
    }

    async fn try_publish(&self) -> Result<Snapshot, PublishError> {
        let window = self.pool.window();
        let snapshot = aggregate(&window, &self.options, Utc::now())?;
        self.store.write(&snapshot).await?;
        Ok(snapshot)
    }

    /// Publish on every tick until shutdown. Ticks that land while a cycle is
    /// running are skipped; a cycle in progress always runs to completion.
    ///
    /// The first tick comes one interval after startup, and ticks are skipped
    /// until the pool has taken in at least one collection cycle, so a restart
    /// keeps serving the previous run's snapshot instead of an empty one.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        if let Err(e) = self.store.cleanup_staging().await {
            tracing::warn!(error = %e, "failed to remove stale staging file");
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            path = %self.store.path().display(),
            "publisher started"
        );

        loop {
            tokio::select! {
                () = shutdown.triggered() => break,
                _ = ticker.tick() => {
                    if self.pool.batches_ingested() == 0 {
                        tracing::debug!("no collection cycle finished yet; keeping current snapshot");
                        continue;
                    }
                    // Errors are already logged and counted.
                    let _ = self.publish_once().await;
                }
            }
        }

        tracing::info!("publisher shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use pulse_core::{RawMention, Source};

    use super::*;

    fn raw(id: &str, rating: Option<f32>) -> RawMention {
        RawMention {
            id: id.to_owned(),
            text: "Tesla".to_owned(),
            timestamp: "2025-03-01T12:00:00Z".parse().unwrap(),
            engagement: BTreeMap::new(),
            matched_terms: BTreeSet::new(),
            rating,
        }
    }

    fn publisher(dir: &std::path::Path) -> (Arc<MentionPool>, Publisher) {
        let pool = Arc::new(MentionPool::new(100));
        let store = SnapshotStore::new(dir.join("snapshot.json"), Duration::from_secs(5)).unwrap();
        let publisher = Publisher::new(
            Arc::clone(&pool),
            store,
            AggregateOptions::default(),
            Duration::from_secs(60),
        );
        (pool, publisher)
    }

    #[tokio::test]
    async fn empty_window_publishes_no_data_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let (_pool, publisher) = publisher(tmp.path());

        let snapshot = publisher.publish_once().await.unwrap();
        assert!(snapshot.no_data);
        assert_eq!(publisher.store().read().await.unwrap(), snapshot);
        assert_eq!(publisher.health().view().published, 1);
    }

    #[tokio::test]
    async fn aggregation_failure_keeps_previous_file_and_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let (pool, publisher) = publisher(tmp.path());
        pool.ingest(Source::AmazonReview, vec![raw("ok", Some(5.0))]);
        let first = publisher.publish_once().await.unwrap();

        pool.ingest(Source::AmazonReview, vec![raw("bad", Some(11.0))]);
        assert!(matches!(
            publisher.publish_once().await,
            Err(PublishError::Aggregation(_))
        ));
        assert!(matches!(
            publisher.publish_once().await,
            Err(PublishError::Aggregation(_))
        ));

        assert_eq!(publisher.store().read().await.unwrap(), first);
        let health = publisher.health().view();
        assert_eq!(health.consecutive_failures, 2);
        assert!(health.last_error.is_some());
        assert_eq!(health.published, 1);
    }

    #[tokio::test]
    async fn write_failure_is_counted_and_reset_on_success() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory squatting on the target path makes the rename fail.
        let target = tmp.path().join("snapshot.json");
        std::fs::create_dir(&target).unwrap();
        let pool = Arc::new(MentionPool::new(10));
        let publisher = Publisher::new(
            pool,
            SnapshotStore::new(&target, Duration::from_secs(5)).unwrap(),
            AggregateOptions::default(),
            Duration::from_secs(60),
        );

        assert!(matches!(
            publisher.publish_once().await,
            Err(PublishError::Write(_))
        ));
        assert_eq!(publisher.health().view().consecutive_failures, 1);

        std::fs::remove_dir(&target).unwrap();
        publisher.publish_once().await.unwrap();
        let health = publisher.health().view();
        assert_eq!(health.consecutive_failures, 0);
        assert!(health.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn run_publishes_on_each_tick_and_stops_on_shutdown() {
        let tmp = tempfile::tempdir().unwrap();
        let (pool, publisher) = publisher(tmp.path());
        pool.ingest(Source::News, vec![raw("n1", None)]);
        let health = publisher.health();
        let (shutdown, signal) = pulse_collector::Shutdown::new();

        let handle = tokio::spawn(publisher.run(signal));
        tokio::time::sleep(Duration::from_secs(150)).await;
        shutdown.trigger();
        handle.await.unwrap();

        // Ticks at 60 and 120 seconds.
        assert_eq!(health.view().published, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_keeps_previous_snapshot_until_collection_lands() {
        let tmp = tempfile::tempdir().unwrap();
        let (pool, publisher) = publisher(tmp.path());
        let store =
            SnapshotStore::new(tmp.path().join("snapshot.json"), Duration::from_secs(5)).unwrap();
        let window = vec![pulse_sentiment::SourceBatch {
            source: Source::News,
            mentions: vec![raw("kept", None)],
        }];
        let previous = aggregate(&window, &AggregateOptions::default(), Utc::now()).unwrap();
        store.write(&previous).await.unwrap();

        let health = publisher.health();
        let (shutdown, signal) = pulse_collector::Shutdown::new();
        let handle = tokio::spawn(publisher.run(signal));

        // Two ticks pass with nothing collected.
        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(store.read().await.unwrap(), previous);
        assert_eq!(health.view().published, 0);

        pool.ingest(Source::News, Vec::new());
        tokio::time::sleep(Duration::from_secs(60)).await;
        shutdown.trigger();
        handle.await.unwrap();

        assert_eq!(health.view().published, 1);
        assert!(store.read().await.unwrap().no_data);
    }
}
