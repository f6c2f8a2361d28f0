//! The published snapshot document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mention::{Mention, Source};

/// Integer percentages per sentiment bucket.
///
/// Either sums to exactly 100, or is all zero when there is no data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub positive: u8,
    pub negative: u8,
    pub neutral: u8,
}

impl Distribution {
    #[must_use]
    pub fn total(&self) -> u16 {
        u16::from(self.positive) + u16::from(self.negative) + u16::from(self.neutral)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// Per-source slice of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformBreakdown {
    pub positive: u8,
    pub negative: u8,
    pub neutral: u8,
    pub count: usize,
}

impl PlatformBreakdown {
    #[must_use]
    pub fn distribution(&self) -> Distribution {
        Distribution {
            positive: self.positive,
            negative: self.negative,
            neutral: self.neutral,
        }
    }
}

/// Per-term summary over the snapshot's mentions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TermMetrics {
    pub mentions: usize,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    /// Mean sentiment score of the mentions carrying this term; 0 when none do.
    pub average_score: f32,
}

/// Cycle metrics derived from the same mentions as the distribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    #[serde(default)]
    pub by_term: BTreeMap<String, TermMetrics>,
    /// Engagement counters summed per platform, keyed by counter name.
    #[serde(default)]
    pub engagement: BTreeMap<Source, BTreeMap<String, u64>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotInvariantError {
    #[error("distribution sums to {0}, expected 100")]
    DistributionSum(u16),

    #[error("no_data flag is {flag} but snapshot holds {mentions} mentions")]
    NoDataMismatch { flag: bool, mentions: usize },

    #[error("sentiment block differs from distribution")]
    SentimentMismatch,

    #[error("by_platform entry for {platform} sums to {total}, expected 100")]
    PlatformDistributionSum { platform: Source, total: u16 },

    #[error("by_platform counts sum to {counted}, but snapshot holds {mentions} mentions")]
    PlatformCount { counted: usize, mentions: usize },

    #[error("by_platform entry for {platform} has a zero count")]
    EmptyPlatform { platform: Source },

    #[error("by_platform entry for {platform} counts {counted}, but {mentions} mentions come from it")]
    PlatformMentionCount {
        platform: Source,
        counted: usize,
        mentions: usize,
    },

    #[error("mention {id} has a sentiment score outside [-1, 1]")]
    ScoreOutOfRange { id: String },
}

/// Complete aggregate state published for consumption at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    /// Same figures as `distribution`; kept for display clients that read this key.
    pub sentiment: Distribution,
    pub distribution: Distribution,
    #[serde(default)]
    pub no_data: bool,
    pub by_platform: BTreeMap<Source, PlatformBreakdown>,
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub metrics: SnapshotMetrics,
}

impl Snapshot {
    /// Check the structural invariants a consumer relies on.
    ///
    /// A document can be well-formed JSON and still violate these, e.g. when
    /// it was hand-edited or produced by an incompatible writer.
    ///
    /// # Errors
    ///
    /// Returns the first [`SnapshotInvariantError`] found.
    pub fn validate(&self) -> Result<(), SnapshotInvariantError> {
        if self.sentiment != self.distribution {
            return Err(SnapshotInvariantError::SentimentMismatch);
        }

        let empty = self.mentions.is_empty();
        if self.no_data != empty {
            return Err(SnapshotInvariantError::NoDataMismatch {
                flag: self.no_data,
                mentions: self.mentions.len(),
            });
        }

        let total = self.distribution.total();
        if empty {
            if total != 0 {
                return Err(SnapshotInvariantError::DistributionSum(total));
            }
        } else if total != 100 {
            return Err(SnapshotInvariantError::DistributionSum(total));
        }

        if let Some(m) = self
            .mentions
            .iter()
            .find(|m| !(-1.0..=1.0).contains(&m.sentiment.score))
        {
            return Err(SnapshotInvariantError::ScoreOutOfRange { id: m.id.clone() });
        }

        let mut per_source: BTreeMap<Source, usize> = BTreeMap::new();
        for m in &self.mentions {
            *per_source.entry(m.source).or_default() += 1;
        }

        let mut counted = 0usize;
        for (source, breakdown) in &self.by_platform {
            if breakdown.count == 0 {
                return Err(SnapshotInvariantError::EmptyPlatform { platform: *source });
            }
            let total = breakdown.distribution().total();
            if total != 100 {
                return Err(SnapshotInvariantError::PlatformDistributionSum {
                    platform: *source,
                    total,
                });
            }
            let mentions = per_source.get(source).copied().unwrap_or(0);
            if breakdown.count != mentions {
                return Err(SnapshotInvariantError::PlatformMentionCount {
                    platform: *source,
                    counted: breakdown.count,
                    mentions,
                });
            }
            counted += breakdown.count;
        }
        if counted != self.mentions.len() {
            return Err(SnapshotInvariantError::PlatformCount {
                counted,
                mentions: self.mentions.len(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::mention::{Sentiment, SentimentCategory};

    fn mention(id: &str, source: Source) -> Mention {
        Mention {
            id: id.to_string(),
            source,
            text: "Tesla deliveries up".to_string(),
            timestamp: "2025-03-01T12:00:00Z".parse().unwrap(),
            engagement: BTreeMap::new(),
            matched_terms: BTreeSet::from(["Tesla".to_string()]),
            rating: None,
            sentiment: Sentiment {
                category: SentimentCategory::Neutral,
                score: 0.0,
            },
        }
    }

    fn full_neutral() -> Distribution {
        Distribution {
            positive: 0,
            negative: 0,
            neutral: 100,
        }
    }

    fn one_mention_snapshot() -> Snapshot {
        Snapshot {
            generated_at: Utc::now(),
            sentiment: full_neutral(),
            distribution: full_neutral(),
            no_data: false,
            by_platform: BTreeMap::from([(
                Source::News,
                PlatformBreakdown {
                    positive: 0,
                    negative: 0,
                    neutral: 100,
                    count: 1,
                },
            )]),
            mentions: vec![mention("n1", Source::News)],
            metrics: SnapshotMetrics::default(),
        }
    }

    #[test]
    fn valid_snapshot_passes() {
        assert_eq!(one_mention_snapshot().validate(), Ok(()));
    }

    #[test]
    fn empty_snapshot_requires_no_data_flag() {
        let snapshot = Snapshot {
            generated_at: Utc::now(),
            sentiment: Distribution::default(),
            distribution: Distribution::default(),
            no_data: false,
            by_platform: BTreeMap::new(),
            mentions: vec![],
            metrics: SnapshotMetrics::default(),
        };
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotInvariantError::NoDataMismatch { .. })
        ));
    }

    #[test]
    fn distribution_must_sum_to_hundred() {
        let mut snapshot = one_mention_snapshot();
        snapshot.distribution.neutral = 99;
        snapshot.sentiment.neutral = 99;
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotInvariantError::DistributionSum(99))
        );
    }

    #[test]
    fn platform_counts_must_cover_mentions() {
        let mut snapshot = one_mention_snapshot();
        snapshot.mentions.push(mention("t1", Source::Twitter));
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotInvariantError::PlatformCount { .. })
        ));
    }

    #[test]
    fn out_of_range_or_nan_score_is_rejected() {
        for score in [1.5, -1.01, f32::NAN] {
            let mut snapshot = one_mention_snapshot();
            snapshot.mentions[0].sentiment.score = score;
            assert_eq!(
                snapshot.validate(),
                Err(SnapshotInvariantError::ScoreOutOfRange {
                    id: "n1".to_string()
                })
            );
        }
    }

    #[test]
    fn platform_entry_must_match_its_own_mentions() {
        let mut snapshot = one_mention_snapshot();
        let breakdown = snapshot.by_platform.remove(&Source::News).unwrap();
        snapshot.by_platform.insert(Source::Reddit, breakdown);
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotInvariantError::PlatformMentionCount {
                platform: Source::Reddit,
                counted: 1,
                mentions: 0,
            })
        );
    }

    #[test]
    fn zero_count_platform_entry_is_rejected() {
        let mut snapshot = one_mention_snapshot();
        snapshot.by_platform.insert(
            Source::Twitter,
            PlatformBreakdown {
                positive: 100,
                negative: 0,
                neutral: 0,
                count: 0,
            },
        );
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotInvariantError::EmptyPlatform {
                platform: Source::Twitter
            })
        );
    }

    #[test]
    fn missing_metrics_field_defaults_to_empty() {
        let mut value = serde_json::to_value(one_mention_snapshot()).unwrap();
        value.as_object_mut().unwrap().remove("metrics");
        let parsed: Snapshot = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.metrics, SnapshotMetrics::default());
    }

    #[test]
    fn missing_no_data_field_defaults_to_false() {
        let mut value = serde_json::to_value(one_mention_snapshot()).unwrap();
        value.as_object_mut().unwrap().remove("no_data");
        let parsed: Snapshot = serde_json::from_value(value).unwrap();
        assert!(!parsed.no_data);
    }

    #[test]
    fn by_platform_keys_serialize_as_source_names() {
        let json = serde_json::to_value(one_mention_snapshot()).unwrap();
        assert_eq!(json["by_platform"]["news"]["count"], 1);
    }
}
