//! The current mention window shared between source tasks and the publisher.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use pulse_core::{RawMention, Source};
use pulse_sentiment::SourceBatch;

/// Per-source append-only log of collected raw mentions, in collection order.
///
/// Each source keeps at most `max_per_source` entries; the oldest are evicted
/// first. Re-collected ids are appended, not merged; the aggregator keeps
/// the latest.
#[derive(Debug)]
pub struct MentionPool {
    max_per_source: usize,
    logs: Mutex<BTreeMap<Source, VecDeque<RawMention>>>,
    batches: AtomicU64,
}

impl MentionPool {
    #[must_use]
    pub fn new(max_per_source: usize) -> Self {
        Self {
            max_per_source: max_per_source.max(1),
            logs: Mutex::new(BTreeMap::new()),
            batches: AtomicU64::new(0),
        }
    }

    /// Append a source's freshly collected mentions. Returns the log length
    /// after eviction. An empty batch still counts as a completed cycle.
    pub fn ingest(&self, source: Source, mentions: Vec<RawMention>) -> usize {
        self.batches.fetch_add(1, Ordering::Relaxed);
        let mut logs = self.lock();
        let log = logs.entry(source).or_default();
        log.extend(mentions);
        while log.len() > self.max_per_source {
            log.pop_front();
        }
        log.len()
    }

    /// Copy of the whole window, one batch per source that has data.
    #[must_use]
    pub fn window(&self) -> Vec<SourceBatch> {
        self.lock()
            .iter()
            .filter(|(_, log)| !log.is_empty())
            .map(|(source, log)| SourceBatch {
                source: *source,
                mentions: log.iter().cloned().collect(),
            })
            .collect()
    }

    /// Number of batches taken in since startup, empty ones included.
    #[must_use]
    pub fn batches_ingested(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self, source: Source) -> usize {
        self.lock().get(&source).map_or(0, VecDeque::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().values().all(VecDeque::is_empty)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Source, VecDeque<RawMention>>> {
        // Writers only push/pop whole entries, so a poisoned log is still consistent.
        self.logs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;

    fn raw(id: &str) -> RawMention {
        RawMention {
            id: id.to_owned(),
            text: String::new(),
            timestamp: "2025-03-01T12:00:00Z".parse().unwrap(),
            engagement: BTreeMap::new(),
            matched_terms: BTreeSet::new(),
            rating: None,
        }
    }

    #[test]
    fn window_groups_by_source_in_collection_order() {
        let pool = MentionPool::new(10);
        pool.ingest(Source::News, vec![raw("n1"), raw("n2")]);
        pool.ingest(Source::Twitter, vec![raw("t1")]);
        pool.ingest(Source::News, vec![raw("n3")]);

        let window = pool.window();
        assert_eq!(window.len(), 2);
        let news = window.iter().find(|b| b.source == Source::News).unwrap();
        let ids: Vec<_> = news.mentions.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "n3"]);
    }

    #[test]
    fn oldest_entries_are_evicted_past_the_cap() {
        let pool = MentionPool::new(2);
        assert_eq!(pool.ingest(Source::Reddit, vec![raw("a"), raw("b"), raw("c")]), 2);
        let window = pool.window();
        let ids: Vec<_> = window[0].mentions.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn recollected_ids_are_appended() {
        let pool = MentionPool::new(10);
        pool.ingest(Source::Reddit, vec![raw("a")]);
        pool.ingest(Source::Reddit, vec![raw("a")]);
        assert_eq!(pool.len(Source::Reddit), 2);
    }

    #[test]
    fn new_pool_is_empty() {
        let pool = MentionPool::new(5);
        assert!(pool.is_empty());
        assert!(pool.window().is_empty());
        assert_eq!(pool.batches_ingested(), 0);
    }

    #[test]
    fn empty_batches_are_counted_but_leave_the_window_empty() {
        let pool = MentionPool::new(5);
        pool.ingest(Source::News, Vec::new());
        assert_eq!(pool.batches_ingested(), 1);
        assert!(pool.is_empty());
        assert!(pool.window().is_empty());
    }
}
