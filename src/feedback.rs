//! # Feedback Analyzer
//! Turns a completed batch of feedback items into sentiment, rating and
//! category aggregates, extracts positive/negative themes, and builds the
//! feature vector the feedback-scoring strategies consume.
//!
//! Pure and deterministic: the same items in the same order always produce
//! a bit-identical aggregate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};
use crate::sentiment::{tokenize, SentimentAnalyzer};
use crate::taxonomy::{categories_for_tokens, Category};
use crate::text::normalize_text;
use crate::types::{FeedbackItem, SLOTS_PER_EVENT};

/// Mean category sentiment above which a category is a positive theme.
pub const POSITIVE_THEME_THRESHOLD: f64 = 0.15;
/// Mean category sentiment below which a category is a negative theme.
pub const NEGATIVE_THEME_THRESHOLD: f64 = -0.15;
/// Themes reported per polarity.
pub const MAX_THEMES: usize = 3;
/// Stand-in for `rating_avg` in the feature vector when no item was rated.
pub const DEFAULT_RATING: f64 = 3.0;

/// Inputs the feedback model sees, in a fixed order (see [`FeatureVector::values`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub sentiment_avg: f64,
    /// Mean star rating, or [`DEFAULT_RATING`] when absent.
    pub rating: f64,
    /// Percentage (0–100) of items mentioning each category.
    pub categories: BTreeMap<Category, f64>,
}

impl FeatureVector {
    pub const LEN: usize = 2 + Category::COUNT;

    /// `[sentiment_avg, rating, pct(venue), pct(food), ...]`
    pub fn values(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(Self::LEN);
        v.push(self.sentiment_avg);
        v.push(self.rating);
        for c in Category::ALL {
            v.push(self.categories.get(&c).copied().unwrap_or(0.0));
        }
        v
    }

    pub fn category(&self, c: Category) -> f64 {
        self.categories.get(&c).copied().unwrap_or(0.0)
    }
}

/// Everything the analyzer derives from one event's feedback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackAggregate {
    pub sentiment_avg: f64,
    pub rating_avg: Option<f64>,
    pub category_breakdown: BTreeMap<Category, f64>,
    pub positive_themes: Vec<Category>,
    pub negative_themes: Vec<Category>,
    pub features: FeatureVector,
}

#[derive(Debug, Clone, Default)]
pub struct FeedbackAnalyzer {
    sentiment: SentimentAnalyzer,
}

#[derive(Debug, Clone, Copy, Default)]
struct CategoryTally {
    mentions: usize,
    sentiment_sum: f64,
}

impl FeedbackAnalyzer {
    pub fn new() -> Self {
        Self {
            sentiment: SentimentAnalyzer::new(),
        }
    }

    /// Analyze exactly [`SLOTS_PER_EVENT`] items.
    pub fn analyze(&self, items: &[FeedbackItem]) -> EngineResult<FeedbackAggregate> {
        if items.len() != SLOTS_PER_EVENT {
            return Err(EngineError::Precondition(format!(
                "need {} feedbacks, only have {}",
                SLOTS_PER_EVENT,
                items.len()
            )));
        }

        let n = items.len() as f64;
        let mut sentiment_sum = 0.0;
        let mut ratings: Vec<u8> = Vec::new();
        let mut tallies = [CategoryTally::default(); Category::COUNT];

        for item in items {
            let tokens = tokenize(&normalize_text(&item.text));
            let s = self.sentiment.item_sentiment(&tokens, item.rating);
            sentiment_sum += s;
            if let Some(r) = item.rating {
                ratings.push(r);
            }
            for c in categories_for_tokens(&tokens) {
                let t = &mut tallies[c.index()];
                t.mentions += 1;
                t.sentiment_sum += s;
            }
        }

        let sentiment_avg = (sentiment_sum / n).clamp(-1.0, 1.0);
        let rating_avg = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().map(|&r| r as f64).sum::<f64>() / ratings.len() as f64)
        };

        let category_breakdown: BTreeMap<Category, f64> = Category::ALL
            .iter()
            .map(|&c| (c, tallies[c.index()].mentions as f64 * 100.0 / n))
            .collect();

        let (positive_themes, negative_themes) = extract_themes(&tallies);

        let features = FeatureVector {
            sentiment_avg,
            rating: rating_avg.unwrap_or(DEFAULT_RATING),
            categories: category_breakdown.clone(),
        };

        Ok(FeedbackAggregate {
            sentiment_avg,
            rating_avg,
            category_breakdown,
            positive_themes,
            negative_themes,
            features,
        })
    }
}

/// Rank categories by `mentions × |avg sentiment|`, split by polarity threshold.
fn extract_themes(tallies: &[CategoryTally; Category::COUNT]) -> (Vec<Category>, Vec<Category>) {
    let mut positive: Vec<(Category, f64)> = Vec::new();
    let mut negative: Vec<(Category, f64)> = Vec::new();

    for c in Category::ALL {
        let t = tallies[c.index()];
        if t.mentions == 0 {
            continue;
        }
        let avg = t.sentiment_sum / t.mentions as f64;
        let weight = t.mentions as f64 * avg.abs();
        if avg > POSITIVE_THEME_THRESHOLD {
            positive.push((c, weight));
        } else if avg < NEGATIVE_THEME_THRESHOLD {
            negative.push((c, weight));
        }
    }

    (top_themes(positive), top_themes(negative))
}

fn top_themes(mut ranked: Vec<(Category, f64)>) -> Vec<Category> {
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(MAX_THEMES).map(|(c, _)| c).collect()
}
