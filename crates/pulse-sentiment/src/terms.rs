//! Tracked-term matching for raw mentions.
//!
//! Word terms match on normalized token boundaries ("model 3" matches
//! "Model-3!" but "tesla" does not match "teslas"). Multi-word terms of six or
//! more letters also match with whitespace removed, which catches
//! "ModelY" for "Model Y"-style brand spellings. Hashtag terms match only
//! hashtags, case-insensitively.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([\p{L}\p{N}_]+)").expect("valid hashtag regex"));

/// Prepared matcher over a fixed set of tracked terms.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    words: Vec<(String, String)>,
    hashtags: Vec<(String, String)>,
}

impl TermMatcher {
    /// Build a matcher. `terms` are the display strings reported back in
    /// `matched_terms`; terms beginning with `#` are treated as hashtags.
    #[must_use]
    pub fn new(terms: &[String]) -> Self {
        let mut words = Vec::new();
        let mut hashtags = Vec::new();
        for term in terms {
            if let Some(tag) = term.strip_prefix('#') {
                let tag = tag.trim().to_lowercase();
                if !tag.is_empty() {
                    hashtags.push((term.clone(), tag));
                }
            } else {
                let normalized = normalize_text_for_match(term);
                if !normalized.is_empty() {
                    words.push((term.clone(), normalized));
                }
            }
        }
        Self { words, hashtags }
    }

    /// Every tracked term that `text` mentions.
    #[must_use]
    pub fn matches(&self, text: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();

        if !self.hashtags.is_empty() {
            let tags: BTreeSet<String> = HASHTAG
                .captures_iter(text)
                .map(|cap| cap[1].to_lowercase())
                .collect();
            for (display, tag) in &self.hashtags {
                if tags.contains(tag) {
                    found.insert(display.clone());
                }
            }
        }

        if !self.words.is_empty() {
            let normalized = normalize_text_for_match(text);
            let padded = format!(" {normalized} ");
            let compact = normalized.replace(' ', "");
            for (display, term) in &self.words {
                let needle = format!(" {term} ");
                let compact_term = term.replace(' ', "");
                let hit = padded.contains(&needle)
                    || (term.contains(' ')
                        && compact_term.len() >= 6
                        && compact.contains(&compact_term));
                if hit {
                    found.insert(display.clone());
                }
            }
        }

        found
    }
}

/// One-shot convenience over [`TermMatcher`].
#[must_use]
pub fn match_terms(text: &str, terms: &[String]) -> BTreeSet<String> {
    TermMatcher::new(terms).matches(text)
}

fn normalize_text_for_match(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_lowercase().next().unwrap_or(ch)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
