//! `publish-once`: a single collect-then-publish pass, for cron jobs and
//! smoke tests.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use pulse_collector::{
    HarnessContext, HarnessSettings, HttpFeedCollector, MentionPool, RunArchive, SourceRunner,
    SourceStatusBoard,
};
use pulse_core::AppConfig;
use pulse_sentiment::{aggregate, AggregateOptions, TermMatcher};
use pulse_snapshot::{Publisher, SnapshotStore};

use crate::show::render_summary;

const USER_AGENT: &str = concat!("pulse-cli/", env!("CARGO_PKG_VERSION"));
const MAX_PAGE_SIZE: usize = 100;

/// Run one cycle for every enabled source concurrently, then publish.
///
/// Source failures are reported and do not stop the other sources; the
/// snapshot is built from whatever was collected.
///
/// # Errors
///
/// Returns an error if configuration is invalid, aggregation fails, or the
/// snapshot cannot be written.
pub(crate) async fn run_publish_once(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let tracking = pulse_core::load_tracking(&config.tracking_path)?;
    let settings = HarnessSettings::from_config(config, &tracking);
    let client = HttpFeedCollector::build_client(config.request_timeout(), USER_AGENT)?;
    let page_size = u32::try_from(settings.per_source_target.min(MAX_PAGE_SIZE))?;
    let collectors =
        HttpFeedCollector::from_tracking(&tracking, &client, page_size, |var| std::env::var(var))?;

    let pool = Arc::new(MentionPool::new(config.window_max_mentions));
    let ctx = Arc::new(HarnessContext {
        settings,
        matcher: TermMatcher::new(&tracking.terms()),
        pool: Arc::clone(&pool),
        board: SourceStatusBoard::new(),
        archive: if dry_run {
            None
        } else {
            config
                .archive_dir
                .as_ref()
                .map(|dir| RunArchive::new(dir, config.io_timeout()))
        },
    });

    let cycles = collectors.into_iter().map(|collector| {
        let mut runner = SourceRunner::new(collector, Arc::clone(&ctx));
        async move {
            let report = runner.run_cycle().await;
            (runner.source(), report)
        }
    });
    for (source, report) in join_all(cycles).await {
        match report.error {
            Some(e) => println!(
                "{:<16}failed after {} page(s): {e}",
                source.as_str(),
                report.pages
            ),
            None => println!(
                "{:<16}{} ingested, {} dropped, {} page(s)",
                source.as_str(),
                report.ingested,
                report.dropped,
                report.pages
            ),
        }
    }

    let options = AggregateOptions {
        priority: tracking.priority(),
        rating_scale: tracking.rating_scale,
        terms: tracking.terms(),
    };

    let snapshot = if dry_run {
        aggregate(&pool.window(), &options, Utc::now())?
    } else {
        let store = SnapshotStore::new(&config.snapshot_path, config.io_timeout())?;
        store.cleanup_staging().await?;
        let publisher = Publisher::new(pool, store, options, config.publish_interval());
        let snapshot = publisher.publish_once().await?;
        println!("wrote {}", config.snapshot_path.display());
        snapshot
    };

    print!("{}", render_summary(&snapshot));
    Ok(())
}
