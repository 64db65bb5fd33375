//! Feedback-scoring model state and strategies.
//!
//! A [`Model`] is immutable once built; the registry swaps whole models.
//! Scoring selects a [`FeedbackStrategy`] once per call from the active model:
//! - `Rubric`  : fixed published coefficients (version 0, untrained)
//! - `Learned` : intercept + fitted coefficients over [`FeatureVector::values`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feedback::FeatureVector;
use crate::taxonomy::Category;

/// Fixed rubric coefficients; they sum to 1 so the rubric stays in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RubricCoefficients {
    /// Applied to `sentiment_avg` rescaled to 0–100.
    pub sentiment: f64,
    /// Applied to the star rating rescaled to 0–100.
    pub rating: f64,
    /// Shared evenly across the category percentages.
    pub coverage: f64,
}

pub const RUBRIC: RubricCoefficients = RubricCoefficients {
    sentiment: 0.55,
    rating: 0.30,
    coverage: 0.15,
};

/// Rubric value used for the rating term when no item carried a rating.
pub const RUBRIC_DEFAULT_RATING_SCORE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedWeights {
    pub intercept: f64,
    /// One coefficient per entry of [`FeatureVector::values`].
    pub coefficients: Vec<f64>,
}

impl LearnedWeights {
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub version: u64,
    pub weights: Option<LearnedWeights>,
    pub trained_on: usize,
    pub fitted_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Version 0: no calibration yet.
    pub fn untrained() -> Self {
        Self {
            version: 0,
            weights: None,
            trained_on: 0,
            fitted_at: None,
        }
    }

    pub fn learned(version: u64, weights: LearnedWeights, trained_on: usize) -> Self {
        Self {
            version,
            weights: Some(weights),
            trained_on,
            fitted_at: Some(Utc::now()),
        }
    }

    pub fn is_learned(&self) -> bool {
        self.weights.is_some()
    }

    pub fn strategy(&self) -> FeedbackStrategy {
        match &self.weights {
            Some(w) => FeedbackStrategy::Learned { weights: w.clone() },
            None => FeedbackStrategy::Rubric {
                coefficients: RUBRIC,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMethod {
    Rubric,
    Learned,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackStrategy {
    Rubric { coefficients: RubricCoefficients },
    Learned { weights: LearnedWeights },
}

impl FeedbackStrategy {
    pub fn method(&self) -> ScoringMethod {
        match self {
            FeedbackStrategy::Rubric { .. } => ScoringMethod::Rubric,
            FeedbackStrategy::Learned { .. } => ScoringMethod::Learned,
        }
    }

    /// Feedback score in `[0, 100]`.
    pub fn score(&self, features: &FeatureVector, rating_present: bool) -> f64 {
        let raw = match self {
            FeedbackStrategy::Rubric { coefficients } => {
                rubric_score(coefficients, features, rating_present)
            }
            FeedbackStrategy::Learned { weights } => weights.predict(&features.values()),
        };
        if raw.is_finite() {
            raw.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

fn rubric_score(k: &RubricCoefficients, f: &FeatureVector, rating_present: bool) -> f64 {
    let sentiment_100 = (f.sentiment_avg + 1.0) * 50.0;
    let rating_100 = if rating_present {
        (f.rating - 1.0) * 25.0
    } else {
        RUBRIC_DEFAULT_RATING_SCORE
    };
    let per_category = k.coverage / Category::COUNT as f64;
    let coverage: f64 = Category::ALL
        .iter()
        .map(|&c| per_category * f.category(c))
        .sum();

    k.sentiment * sentiment_100 + k.rating * rating_100 + coverage
}
