//! Sentiment classification and snapshot aggregation for brand-pulse.
//!
//! Everything here is pure: a lexicon scorer and rating normalizer behind
//! [`classify`], a term matcher for tagging raw mentions, and the
//! [`aggregate`] step that turns per-source windows into a [`pulse_core::Snapshot`].

pub mod aggregator;
pub mod classifier;
pub mod error;
pub mod scorer;
pub mod terms;

pub use aggregator::{aggregate, distribution_from_counts, AggregateOptions, SourceBatch};
pub use classifier::{categorize, classify, rating_score, CATEGORY_THRESHOLD};
pub use error::AggregationError;
pub use scorer::lexicon_score;
pub use terms::{match_terms, TermMatcher};
