//! # Sentiment
//! Lexicon scoring of a single feedback item.
//!
//! Each matched token contributes its lexicon weight; a negator within the
//! three preceding tokens flips the sign. The raw sum is scaled by the square
//! root of the token count so long texts with a single polar word read as
//! milder than short ones, then clamped to `[-1, 1]`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../feedback_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).unwrap_or_default()
});

static TOKEN_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?u)[\w']+").ok());

/// Weight of the text part when an item also carries a star rating.
pub const TEXT_BLEND: f64 = 0.7;
/// Weight of the rescaled star rating.
pub const RATING_BLEND: f64 = 0.3;

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

    /// Raw lexicon sum over pre-tokenized input, with negation.
    pub fn lexicon_sum(&self, tokens: &[String]) -> i32 {
        let mut score: i32 = 0;
        for (i, tok) in tokens.iter().enumerate() {
            let base = self.word_score(tok);
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }
        score
    }

    /// Text-only sentiment in `[-1, 1]`.
    pub fn text_sentiment(&self, tokens: &[String]) -> f64 {
        if tokens.is_empty() {
            return 0.0;
        }
        let sum = self.lexicon_sum(tokens) as f64;
        (sum / (tokens.len() as f64).sqrt()).clamp(-1.0, 1.0)
    }

    /// Item sentiment: text-only, or blended 70/30 with the rating rescaled
    /// from `1..=5` to `[-1, 1]` when a rating is present.
    pub fn item_sentiment(&self, tokens: &[String], rating: Option<u8>) -> f64 {
        let text = self.text_sentiment(tokens);
        match rating {
            Some(r) => TEXT_BLEND * text + RATING_BLEND * rating_to_polarity(r),
            None => text,
        }
    }
}

/// Map a 1–5 star rating to `[-1, 1]` (3 stars is neutral).
pub fn rating_to_polarity(rating: u8) -> f64 {
    ((rating as f64 - 3.0) / 2.0).clamp(-1.0, 1.0)
}

/// Lower-cased word tokens; apostrophes stay inside words so "wasn't" is one token.
pub fn tokenize(s: &str) -> Vec<String> {
    match TOKEN_RE.as_ref() {
        Some(re) => re
            .find_iter(s)
            .map(|m| {
                let t = m.as_str().trim_matches('\'').to_lowercase();
                // possessive: "food's" matches "food"
                match t.strip_suffix("'s") {
                    Some(stem) => stem.to_string(),
                    None => t,
                }
            })
            .filter(|t| !t.is_empty())
            .collect(),
        None => s
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect(),
    }
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "weren't"
            | "aren't"
            | "didn't"
            | "don't"
            | "won't"
            | "can't"
            | "cannot"
            | "hardly"
            | "without"
    )
}
