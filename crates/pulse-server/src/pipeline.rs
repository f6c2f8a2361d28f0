//! Wires collectors, the publisher, and the watcher into background tasks.

use std::sync::Arc;

use pulse_collector::{
    spawn_collectors, Collector, HarnessContext, HarnessSettings, HttpFeedCollector, MentionPool,
    RunArchive, Shutdown, SourceStatus, SourceStatusBoard,
};
use pulse_core::{AppConfig, TrackingConfig};
use pulse_sentiment::{AggregateOptions, TermMatcher};
use pulse_snapshot::{Publisher, SnapshotStore, SnapshotWatcher};
use tokio::task::JoinHandle;

use crate::api::AppState;

const USER_AGENT: &str = concat!("pulse-server/", env!("CARGO_PKG_VERSION"));
const MAX_PAGE_SIZE: usize = 100;

/// Background tasks plus the read handles the API serves from.
pub struct Pipeline {
    pub state: AppState,
    shutdown: Shutdown,
    handles: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Build every component and spawn its task.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built, a source token is missing,
    /// or the snapshot path is unusable.
    pub fn start(config: &AppConfig, tracking: &TrackingConfig) -> anyhow::Result<Self> {
        let settings = HarnessSettings::from_config(config, tracking);
        let client = HttpFeedCollector::build_client(config.request_timeout(), USER_AGENT)?;
        let page_size = u32::try_from(settings.per_source_target.min(MAX_PAGE_SIZE))?;
        let collectors =
            HttpFeedCollector::from_tracking(tracking, &client, page_size, |var| std::env::var(var))?;

        let pool = Arc::new(MentionPool::new(config.window_max_mentions));
        let board = SourceStatusBoard::new();
        for collector in &collectors {
            board.publish(SourceStatus::pending(collector.source()));
        }

        let ctx = Arc::new(HarnessContext {
            settings,
            matcher: TermMatcher::new(&tracking.terms()),
            pool: Arc::clone(&pool),
            board: board.clone(),
            archive: config
                .archive_dir
                .as_ref()
                .map(|dir| RunArchive::new(dir, config.io_timeout())),
        });

        let store = SnapshotStore::new(&config.snapshot_path, config.io_timeout())?;
        let publisher = Publisher::new(
            pool,
            store,
            AggregateOptions {
                priority: tracking.priority(),
                rating_scale: tracking.rating_scale,
                terms: tracking.terms(),
            },
            config.publish_interval(),
        );
        let watcher = SnapshotWatcher::new(&config.snapshot_path, config.io_timeout());

        let state = AppState {
            cache: watcher.cache(),
            watcher: watcher.status(),
            publisher: publisher.health(),
            sources: board,
        };

        let (shutdown, _) = Shutdown::new();
        tracing::info!(
            brand = %tracking.brand,
            sources = collectors.len(),
            per_source_target = ctx.settings.per_source_target,
            "starting collection pipeline"
        );
        let mut handles = spawn_collectors(collectors, &ctx, &shutdown);
        handles.push(tokio::spawn(publisher.run(shutdown.signal())));
        handles.push(tokio::spawn(
            watcher.run(config.poll_interval(), shutdown.signal()),
        ));

        Ok(Self {
            state,
            shutdown,
            handles,
        })
    }

    /// Signal every task and wait for in-flight cycles to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "pipeline task panicked");
            }
        }
        tracing::info!("pipeline stopped");
    }
}
