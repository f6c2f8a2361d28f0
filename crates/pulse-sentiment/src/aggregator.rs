//! Window → [`Snapshot`] aggregation.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use pulse_core::{
    Distribution, Mention, PlatformBreakdown, RatingScale, RawMention, SentimentCategory,
    Snapshot, SnapshotMetrics, Source, TermMetrics,
};

use crate::classifier::classify;
use crate::error::AggregationError;

/// Raw mentions from one source, oldest collection first.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: Source,
    pub mentions: Vec<RawMention>,
}

#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Source ordering for the `mentions` list. Sources not listed sort last,
    /// in [`Source::ALL`] order.
    pub priority: Vec<Source>,
    pub rating_scale: RatingScale,
    /// Tracked terms, listed in the metrics even when no mention carries them.
    pub terms: Vec<String>,
}

/// Per-bucket tallies before conversion to percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    positive: usize,
    negative: usize,
    neutral: usize,
}

impl Counts {
    fn add(&mut self, category: SentimentCategory) {
        match category {
            SentimentCategory::Positive => self.positive += 1,
            SentimentCategory::Negative => self.negative += 1,
            SentimentCategory::Neutral => self.neutral += 1,
        }
    }

    fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Build a snapshot from the current window.
///
/// Batches for the same source are treated as one log in the order given.
/// Within a source, the last occurrence of an id wins and sits at that later
/// position. Output order is source priority, then collection order.
///
/// # Errors
///
/// Returns [`AggregationError::InvalidMention`] for the first raw mention that
/// fails validation; nothing is published for that cycle.
pub fn aggregate(
    batches: &[SourceBatch],
    options: &AggregateOptions,
    generated_at: DateTime<Utc>,
) -> Result<Snapshot, AggregationError> {
    let mut logs: BTreeMap<Source, Vec<&RawMention>> = BTreeMap::new();
    for batch in batches {
        for raw in &batch.mentions {
            raw.validate(&options.rating_scale)
                .map_err(|reason| AggregationError::InvalidMention {
                    platform: batch.source,
                    id: raw.id.clone(),
                    reason,
                })?;
        }
        logs.entry(batch.source)
            .or_default()
            .extend(batch.mentions.iter());
    }

    let mut order = options.priority.clone();
    for source in Source::ALL {
        if !order.contains(&source) {
            order.push(source);
        }
    }

    let mut mentions = Vec::new();
    let mut overall = Counts::default();
    let mut by_platform = BTreeMap::new();

    for source in order {
        let Some(log) = logs.get(&source) else {
            continue;
        };

        let mut last_seen: HashMap<&str, usize> = HashMap::with_capacity(log.len());
        for (idx, raw) in log.iter().enumerate() {
            last_seen.insert(raw.id.as_str(), idx);
        }

        let mut counts = Counts::default();
        for (idx, raw) in log.iter().enumerate() {
            if last_seen.get(raw.id.as_str()) != Some(&idx) {
                continue;
            }
            let sentiment = classify(raw, &options.rating_scale);
            counts.add(sentiment.category);
            mentions.push(Mention::classified(source, (*raw).clone(), sentiment));
        }

        if counts.total() > 0 {
            let dist = counts_to_distribution(counts);
            by_platform.insert(
                source,
                PlatformBreakdown {
                    positive: dist.positive,
                    negative: dist.negative,
                    neutral: dist.neutral,
                    count: counts.total(),
                },
            );
        }
        overall.positive += counts.positive;
        overall.negative += counts.negative;
        overall.neutral += counts.neutral;
    }

    let distribution = counts_to_distribution(overall);
    let metrics = summarize(&mentions, &options.terms);
    tracing::debug!(
        mentions = mentions.len(),
        sources = by_platform.len(),
        "aggregated mention window"
    );

    Ok(Snapshot {
        generated_at,
        sentiment: distribution,
        distribution,
        no_data: mentions.is_empty(),
        by_platform,
        mentions,
        metrics,
    })
}

/// Per-term sentiment and per-platform engagement totals.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn summarize(mentions: &[Mention], terms: &[String]) -> SnapshotMetrics {
    let mut by_term: BTreeMap<String, (TermMetrics, f64)> = terms
        .iter()
        .map(|t| (t.clone(), (TermMetrics::default(), 0.0)))
        .collect();
    let mut engagement: BTreeMap<Source, BTreeMap<String, u64>> = BTreeMap::new();

    for mention in mentions {
        for term in &mention.matched_terms {
            let (entry, score_sum) = by_term.entry(term.clone()).or_default();
            entry.mentions += 1;
            match mention.sentiment.category {
                SentimentCategory::Positive => entry.positive += 1,
                SentimentCategory::Negative => entry.negative += 1,
                SentimentCategory::Neutral => entry.neutral += 1,
            }
            *score_sum += f64::from(mention.sentiment.score);
        }

        let totals = engagement.entry(mention.source).or_default();
        for (counter, value) in &mention.engagement {
            let total = totals.entry(counter.clone()).or_default();
            *total = total.saturating_add(*value);
        }
    }

    SnapshotMetrics {
        by_term: by_term
            .into_iter()
            .map(|(term, (mut entry, score_sum))| {
                if entry.mentions > 0 {
                    entry.average_score = (score_sum / entry.mentions as f64) as f32;
                }
                (term, entry)
            })
            .collect(),
        engagement,
    }
}

fn counts_to_distribution(counts: Counts) -> Distribution {
    distribution_from_counts(counts.positive, counts.negative, counts.neutral)
}

/// Convert bucket counts to integer percentages summing to exactly 100.
///
/// Each bucket is floored; the remainder goes to the largest bucket, with ties
/// resolved neutral, then positive, then negative. All-zero input yields an
/// all-zero distribution.
#[must_use]
pub fn distribution_from_counts(positive: usize, negative: usize, neutral: usize) -> Distribution {
    let total = positive + negative + neutral;
    if total == 0 {
        return Distribution::default();
    }

    let pct = |count: usize| -> u8 { u8::try_from(count * 100 / total).unwrap_or(100) };
    let mut dist = Distribution {
        positive: pct(positive),
        negative: pct(negative),
        neutral: pct(neutral),
    };

    let remainder = u8::try_from(100 - dist.total()).unwrap_or(0);
    if neutral >= positive && neutral >= negative {
        dist.neutral += remainder;
    } else if positive >= negative {
        dist.positive += remainder;
    } else {
        dist.negative += remainder;
    }
    dist
}
