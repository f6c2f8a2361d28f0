//! Per-source orchestration: one task per collector, each with its own
//! [`CollectorState`], paging budget, and backoff.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pulse_core::{AppConfig, Cursor, RatingScale, RawMention, Source, TrackingConfig};
use pulse_sentiment::TermMatcher;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::archive::RunArchive;
use crate::backoff::BackoffPolicy;
use crate::collector::Collector;
use crate::error::{CollectionError, ErrorKind};
use crate::pool::MentionPool;
use crate::shutdown::{Shutdown, ShutdownSignal};
use crate::status::{SourceHealth, SourceStatus, SourceStatusBoard};

/// Timing and volume knobs shared by every source task.
#[derive(Debug, Clone)]
pub struct HarnessSettings {
    pub collect_interval: Duration,
    pub request_timeout: Duration,
    pub collect_budget: Duration,
    /// Mentions each source tries to gather per cycle.
    pub per_source_target: usize,
    pub backoff: BackoffPolicy,
    pub rating_scale: RatingScale,
}

impl HarnessSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig, tracking: &TrackingConfig) -> Self {
        Self {
            collect_interval: config.collect_interval(),
            request_timeout: config.request_timeout(),
            collect_budget: config.collect_budget(),
            per_source_target: tracking.per_source_target(),
            backoff: BackoffPolicy {
                base: config.retry_backoff_base(),
                max: config.retry_max_delay(),
            },
            rating_scale: tracking.rating_scale,
        }
    }
}

/// Everything a source task shares with the rest of the process.
#[derive(Debug)]
pub struct HarnessContext {
    pub settings: HarnessSettings,
    pub matcher: TermMatcher,
    pub pool: Arc<MentionPool>,
    pub board: SourceStatusBoard,
    pub archive: Option<RunArchive>,
}

/// Mutable per-source bookkeeping. Owned by exactly one task.
#[derive(Debug, Clone, Default)]
pub struct CollectorState {
    pub cursor: Option<Cursor>,
    pub consecutive_failures: u32,
    pub backoff_until: Option<Instant>,
    pub retry_at: Option<DateTime<Utc>>,
    pub disabled: bool,
    pub runs: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// What one collection cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub pages: usize,
    pub ingested: usize,
    pub dropped: usize,
    pub error: Option<CollectionError>,
    /// Wait before the next cycle; `None` once the source is disabled.
    pub next_delay: Option<Duration>,
}

/// Drives a single [`Collector`].
pub struct SourceRunner {
    collector: Arc<dyn Collector>,
    ctx: Arc<HarnessContext>,
    state: CollectorState,
}

impl SourceRunner {
    #[must_use]
    pub fn new(collector: Arc<dyn Collector>, ctx: Arc<HarnessContext>) -> Self {
        Self {
            collector,
            ctx,
            state: CollectorState::default(),
        }
    }

    #[must_use]
    pub fn source(&self) -> Source {
        self.collector.source()
    }

    #[must_use]
    pub fn state(&self) -> &CollectorState {
        &self.state
    }

    /// Run cycles until shutdown, sleeping the collect interval after a
    /// success and the backoff delay after a failure. Returns early, and
    /// stays stopped, once an auth failure disables the source.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) {
        let source = self.source();
        self.publish_status();
        tracing::info!(source = %source, "collector task started");

        loop {
            let report = tokio::select! {
                () = shutdown.triggered() => break,
                report = self.run_cycle() => report,
            };

            let Some(delay) = report.next_delay else {
                tracing::warn!(source = %source, "collector task stopped; source disabled");
                return;
            };

            tokio::select! {
                () = shutdown.triggered() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!(source = %source, "collector task shut down");
    }

    /// One collection cycle: page until the per-source target, the budget,
    /// an empty page, or a stalled cursor; ingest what arrived; update state.
    #[allow(clippy::too_many_lines)]
    pub async fn run_cycle(&mut self) -> CycleReport {
        let source = self.source();
        let settings = &self.ctx.settings;
        let deadline = Instant::now() + settings.collect_budget;

        let mut report = CycleReport::default();
        let mut collected: Vec<RawMention> = Vec::new();
        let mut cursor = self.state.cursor.clone();

        while collected.len() < settings.per_source_target {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::debug!(source = %source, pages = report.pages, "collect budget exhausted");
                break;
            }
            let call_timeout = settings.request_timeout.min(remaining);
            let budget_bound = call_timeout < settings.request_timeout;

            let batch = match tokio::time::timeout(
                call_timeout,
                self.collector.collect(cursor.as_ref()),
            )
            .await
            {
                Ok(Ok(batch)) => batch,
                Ok(Err(e)) => {
                    report.error = Some(e);
                    break;
                }
                Err(_) if budget_bound && report.pages > 0 => {
                    tracing::debug!(source = %source, pages = report.pages, "collect budget exhausted mid-call");
                    break;
                }
                Err(_) => {
                    report.error = Some(CollectionError::Timeout(call_timeout));
                    break;
                }
            };

            report.pages += 1;
            let page_len = batch.mentions.len();
            tracing::debug!(source = %source, page = report.pages, mentions = page_len, "collected page");
            collected.extend(batch.mentions);

            let advanced = batch.next_cursor.is_some() && batch.next_cursor != cursor;
            if let Some(next) = batch.next_cursor {
                cursor = Some(next);
            }
            if page_len == 0 || !advanced {
                break;
            }
        }

        self.state.cursor = cursor;
        self.state.runs += 1;

        let prepared = self.prepare(collected, &mut report);
        report.ingested = prepared.len();
        if report.error.is_none() && !prepared.is_empty() {
            self.archive(&prepared).await;
        }
        // A clean cycle is ingested even when empty so the publisher knows
        // collection has started.
        let window_len = if prepared.is_empty() && report.error.is_some() {
            self.ctx.pool.len(source)
        } else {
            self.ctx.pool.ingest(source, prepared)
        };

        match report.error.as_ref() {
            None => {
                self.state.consecutive_failures = 0;
                self.state.backoff_until = None;
                self.state.retry_at = None;
                self.state.last_error = None;
                self.state.last_success_at = Some(Utc::now());
                report.next_delay = Some(self.ctx.settings.collect_interval);
                tracing::info!(
                    source = %source,
                    pages = report.pages,
                    ingested = report.ingested,
                    dropped = report.dropped,
                    window = window_len,
                    "collection cycle complete"
                );
            }
            Some(e) if e.kind() == ErrorKind::Auth => {
                self.state.consecutive_failures += 1;
                self.state.disabled = true;
                self.state.backoff_until = None;
                self.state.retry_at = None;
                self.state.last_error = Some(e.to_string());
                report.next_delay = None;
                tracing::error!(
                    source = %source,
                    error = %e,
                    "authentication failed; source disabled until reconfigured"
                );
            }
            Some(e) => {
                self.state.consecutive_failures += 1;
                let delay = self
                    .ctx
                    .settings
                    .backoff
                    .delay_for(self.state.consecutive_failures, e);
                self.state.backoff_until = Some(Instant::now() + delay);
                self.state.retry_at = chrono::Duration::from_std(delay)
                    .ok()
                    .map(|d| Utc::now() + d);
                self.state.last_error = Some(e.to_string());
                report.next_delay = Some(delay);
                tracing::warn!(
                    source = %source,
                    error = %e,
                    failures = self.state.consecutive_failures,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    ingested = report.ingested,
                    "collection failed; backing off"
                );
            }
        }

        self.publish_status_with_window(window_len);
        report
    }

    /// Ingestion boundary: drop invalid mentions, fill empty `matched_terms`.
    fn prepare(&self, raw: Vec<RawMention>, report: &mut CycleReport) -> Vec<RawMention> {
        let source = self.source();
        let scale = &self.ctx.settings.rating_scale;
        let mut kept = Vec::with_capacity(raw.len());
        for mut mention in raw {
            if let Err(e) = mention.validate(scale) {
                tracing::warn!(source = %source, id = %mention.id, error = %e, "dropping invalid mention");
                report.dropped += 1;
                continue;
            }
            if mention.matched_terms.is_empty() {
                mention.matched_terms = self.ctx.matcher.matches(&mention.text);
            }
            kept.push(mention);
        }
        kept
    }

    async fn archive(&self, mentions: &[RawMention]) {
        let Some(archive) = &self.ctx.archive else {
            return;
        };
        let source = self.source();
        match archive
            .write(source, self.state.runs, Utc::now(), mentions)
            .await
        {
            Ok(path) => {
                tracing::debug!(source = %source, path = %path.display(), "archived raw run");
            }
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "failed to archive raw run");
            }
        }
    }

    fn publish_status(&self) {
        let window_len = self.ctx.pool.len(self.source());
        self.publish_status_with_window(window_len);
    }

    fn publish_status_with_window(&self, window_len: usize) {
        let health = if self.state.disabled {
            SourceHealth::Disabled
        } else if self.state.consecutive_failures > 0 {
            SourceHealth::BackingOff
        } else if self.state.runs == 0 {
            SourceHealth::Pending
        } else {
            SourceHealth::Healthy
        };
        self.ctx.board.publish(SourceStatus {
            source: self.source(),
            health,
            consecutive_failures: self.state.consecutive_failures,
            cursor: self.state.cursor.clone(),
            last_success_at: self.state.last_success_at,
            retry_at: self.state.retry_at,
            last_error: self.state.last_error.clone(),
            runs: self.state.runs,
            window_len,
        });
    }
}

/// Spawn one task per collector. Each task stops when `shutdown` fires.
pub fn spawn_collectors(
    collectors: Vec<Arc<dyn Collector>>,
    ctx: &Arc<HarnessContext>,
    shutdown: &Shutdown,
) -> Vec<JoinHandle<()>> {
    collectors
        .into_iter()
        .map(|collector| {
            let runner = SourceRunner::new(collector, Arc::clone(ctx));
            tokio::spawn(runner.run(shutdown.signal()))
        })
        .collect()
}

#[cfg(test)]
#[path = "harness_test.rs"]
mod tests;
