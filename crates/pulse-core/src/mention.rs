//! Mention types: what collectors return and what snapshots carry.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform a mention was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Twitter,
    Reddit,
    News,
    AmazonReview,
}

impl Source {
    /// Every known source, in the default publication priority order.
    pub const ALL: [Source; 4] = [
        Source::Twitter,
        Source::Reddit,
        Source::News,
        Source::AmazonReview,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Twitter => "twitter",
            Source::Reddit => "reddit",
            Source::News => "news",
            Source::AmazonReview => "amazon_review",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = MentionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| MentionError::UnknownSource(s.to_string()))
    }
}

/// Opaque per-source collection progress marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentCategory {
    Positive,
    Neutral,
    Negative,
}

/// Classifier output attached to a [`Mention`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub category: SentimentCategory,
    /// Score in `[-1.0, 1.0]`.
    pub score: f32,
}

/// Closed numeric range a rating-bearing source reports on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: f32,
    pub max: f32,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 1.0, max: 5.0 }
    }
}

impl RatingScale {
    #[must_use]
    pub fn contains(&self, rating: f32) -> bool {
        rating.is_finite() && rating >= self.min && rating <= self.max
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MentionError {
    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("mention has an empty id")]
    EmptyId,

    #[error("rating {rating} outside scale {min}..={max}")]
    RatingOutOfRange { rating: f32, min: f32, max: f32 },
}

/// A mention as returned by a collector, before classification.
///
/// Carries no sentiment; only the classifier produces a [`Sentiment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMention {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub engagement: BTreeMap<String, u64>,
    #[serde(default)]
    pub matched_terms: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

impl RawMention {
    /// Check the fields a collector could plausibly get wrong.
    ///
    /// # Errors
    ///
    /// Returns [`MentionError`] for an empty id or an out-of-scale rating.
    pub fn validate(&self, scale: &RatingScale) -> Result<(), MentionError> {
        if self.id.trim().is_empty() {
            return Err(MentionError::EmptyId);
        }
        if let Some(rating) = self.rating {
            if !scale.contains(rating) {
                return Err(MentionError::RatingOutOfRange {
                    rating,
                    min: scale.min,
                    max: scale.max,
                });
            }
        }
        Ok(())
    }
}

/// A classified mention as published in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    pub source: Source,
    #[serde(default)]
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub engagement: BTreeMap<String, u64>,
    #[serde(default)]
    pub matched_terms: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    pub sentiment: Sentiment,
}

impl Mention {
    /// Attach a classification to a raw mention.
    #[must_use]
    pub fn classified(source: Source, raw: RawMention, sentiment: Sentiment) -> Self {
        Self {
            id: raw.id,
            source,
            text: raw.text,
            timestamp: raw.timestamp,
            engagement: raw.engagement,
            matched_terms: raw.matched_terms,
            rating: raw.rating,
            sentiment,
        }
    }
}
