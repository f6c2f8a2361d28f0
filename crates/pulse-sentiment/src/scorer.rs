//! Lexicon scorer for consumer brand mentions.

/// Word weights.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("good", 0.3),
    ("great", 0.4),
    ("excellent", 0.5),
    ("amazing", 0.5),
    ("awesome", 0.5),
    ("fantastic", 0.5),
    ("wonderful", 0.5),
    ("love", 0.5),
    ("loved", 0.5),
    ("best", 0.5),
    ("happy", 0.4),
    ("positive", 0.3),
    ("recommend", 0.4),
    ("reliable", 0.4),
    ("fast", 0.2),
    ("impressive", 0.4),
    ("quality", 0.3),
    ("worth", 0.3),
    ("perfect", 0.5),
    ("win", 0.3),
    // Negative signals
    ("bad", -0.4),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("horrible", -0.6),
    ("poor", -0.4),
    ("worst", -0.6),
    ("hate", -0.6),
    ("disappointing", -0.5),
    ("disappointed", -0.5),
    ("negative", -0.3),
    ("problem", -0.3),
    ("issue", -0.3),
    ("fail", -0.4),
    ("failed", -0.4),
    ("broken", -0.5),
    ("recall", -0.6),
    ("lawsuit", -0.5),
    ("refund", -0.3),
    ("scam", -0.7),
    ("slow", -0.2),
];

/// Words that flip the polarity of the next lexicon hit.
const NEGATIONS: &[&str] = &["not", "no", "never", "dont", "don't", "isnt", "isn't"];

/// Score a text string using the lexicon.
///
/// Splits text into lowercase words, sums matching weights (flipping the sign
/// of a hit directly preceded by a negation), and clamps the result to
/// `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    let mut negate_next = false;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic() && c != '\'')
            .to_lowercase();
        if NEGATIONS.contains(&w.as_str()) {
            negate_next = true;
            continue;
        }
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            score += if negate_next { -weight } else { weight };
        }
        negate_next = false;
    }
    score.clamp(-1.0, 1.0)
}
