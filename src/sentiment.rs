use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::sources::text::tokenize;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).unwrap_or_default()
});

/// Coarse polarity of a body of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Label for a polarity in `-1.0..=1.0` (±0.15 dead band).
    pub fn from_polarity(p: f32) -> Self {
        if p > 0.15 {
            SentimentLabel::Positive
        } else if p < -0.15 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

/// Lexicon scorer for short texts such as news headlines.
#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Returns (score, token count).
    /// Negation: a negator within the previous 1..=3 tokens flips the word's sign.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }

        (score, tokens.len())
    }

    /// Mean per-text polarity in `-1.0..=1.0`: each text contributes the sign of
    /// its score, so one very loud headline cannot dominate.
    pub fn polarity<'a, I>(&self, texts: I) -> f32
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut n = 0usize;
        let mut acc = 0i32;
        for t in texts {
            n += 1;
            acc += self.score_text(t).0.signum();
        }
        if n == 0 {
            return 0.0;
        }
        (acc as f32 / n as f32).clamp(-1.0, 1.0)
    }
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not" | "no" | "never" | "isn't" | "wasn't" | "aren't" | "won't" | "can't" | "cannot"
            | "without"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_and_negative_headlines() {
        let a = SentimentAnalyzer::new();
        assert!(a.score_text("AI startups see record growth").0 > 0);
        assert!(a.score_text("Regulators warn of AI risks after breach").0 < 0);
    }

    #[test]
    fn negation_flips_sign() {
        let a = SentimentAnalyzer::new();
        let (plain, _) = a.score_text("launch was a success");
        let (negated, _) = a.score_text("launch was not a success");
        assert!(plain > 0);
        assert!(negated < 0);
    }

    #[test]
    fn polarity_is_bounded_and_labelled() {
        let a = SentimentAnalyzer::new();
        let p = a.polarity(["strong gains", "boom continues", "crash fears"].iter().copied());
        assert!((p - (1.0 / 3.0)).abs() < 1e-6);
        assert_eq!(SentimentLabel::from_polarity(p), SentimentLabel::Positive);
        assert_eq!(a.polarity(std::iter::empty()), 0.0);
    }
}
