//! Mention → sentiment classification.
//!
//! Pure and deterministic: no I/O, no state. Rating-bearing mentions are
//! scored from their rating; everything else goes through the lexicon. Both
//! paths share one categorization boundary.

use pulse_core::{RatingScale, RawMention, Sentiment, SentimentCategory};

use crate::scorer::lexicon_score;

/// Magnitude a score must strictly exceed to leave the neutral bucket.
pub const CATEGORY_THRESHOLD: f32 = 0.2;

/// Classify one raw mention.
#[must_use]
pub fn classify(mention: &RawMention, scale: &RatingScale) -> Sentiment {
    let score = match mention.rating {
        Some(rating) => rating_score(rating, scale),
        None => lexicon_score(&mention.text),
    };
    Sentiment {
        category: categorize(score),
        score,
    }
}

/// Map a rating linearly from `scale` onto `[-1.0, 1.0]`.
///
/// Out-of-scale ratings are clamped; validation rejects them before they get
/// here in the pipeline.
#[must_use]
pub fn rating_score(rating: f32, scale: &RatingScale) -> f32 {
    let span = scale.max - scale.min;
    if span <= 0.0 || !rating.is_finite() {
        return 0.0;
    }
    let normalized = (rating - scale.min) / span;
    (normalized * 2.0 - 1.0).clamp(-1.0, 1.0)
}

/// Bucket a score. A score exactly on a threshold stays neutral.
#[must_use]
pub fn categorize(score: f32) -> SentimentCategory {
    if score > CATEGORY_THRESHOLD {
        SentimentCategory::Positive
    } else if score < -CATEGORY_THRESHOLD {
        SentimentCategory::Negative
    } else {
        SentimentCategory::Neutral
    }
}
