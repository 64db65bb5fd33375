//! # Score Composer
//! Blends feedback and revenue sub-scores into the Value Score and builds
//! the explanation payload.
//!
//! Policy: `value = 0.5 × feedback + 0.5 × revenue`, always. Only the
//! feedback-scoring strategy varies (rubric vs learned), and it is picked
//! once per call from the model snapshot handed in by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::feedback::{FeatureVector, FeedbackAggregate};
use crate::model::{Model, ScoringMethod};
use crate::revenue::RevenueAssessment;
use crate::taxonomy::Category;
use crate::types::EventId;

pub const FEEDBACK_WEIGHT: f64 = 0.5;
pub const REVENUE_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub feedback: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackExplanation {
    pub method: ScoringMethod,
    pub positive_themes: Vec<Category>,
    pub negative_themes: Vec<Category>,
    pub category_breakdown: BTreeMap<Category, f64>,
    pub sentiment_avg: f64,
    pub rating_avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub feedback: FeedbackExplanation,
    pub revenue: RevenueAssessment,
    pub weights: BlendWeights,
}

/// Deterministic part of a score: identical inputs and model version give
/// an identical outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub event_id: EventId,
    pub revenue_score: f64,
    pub feedback_score: f64,
    pub value_score: f64,
    pub feature_vector: FeatureVector,
    pub model_version: u64,
    pub explanation: Explanation,
}

/// Cached per event; its presence is the event's `has_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(flatten)]
    pub outcome: ScoreOutcome,
    pub computed_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn event_id(&self) -> EventId {
        self.outcome.event_id
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreComposer;

impl ScoreComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn compose(
        &self,
        event_id: EventId,
        feedback: &FeedbackAggregate,
        revenue: &RevenueAssessment,
        model: &Model,
    ) -> ScoreOutcome {
        let strategy = model.strategy();
        let feedback_score = strategy.score(&feedback.features, feedback.rating_avg.is_some());
        let revenue_score = revenue.revenue_score.clamp(0.0, 100.0);
        let value_score = blend(feedback_score, revenue_score);

        ScoreOutcome {
            event_id,
            revenue_score,
            feedback_score,
            value_score,
            feature_vector: feedback.features.clone(),
            model_version: model.version,
            explanation: Explanation {
                feedback: FeedbackExplanation {
                    method: strategy.method(),
                    positive_themes: feedback.positive_themes.clone(),
                    negative_themes: feedback.negative_themes.clone(),
                    category_breakdown: feedback.category_breakdown.clone(),
                    sentiment_avg: feedback.sentiment_avg,
                    rating_avg: feedback.rating_avg,
                },
                revenue: revenue.clone(),
                weights: BlendWeights {
                    feedback: FEEDBACK_WEIGHT,
                    revenue: REVENUE_WEIGHT,
                },
            },
        }
    }
}

pub fn blend(feedback_score: f64, revenue_score: f64) -> f64 {
    FEEDBACK_WEIGHT * feedback_score + REVENUE_WEIGHT * revenue_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackAnalyzer;
    use crate::model::LearnedWeights;
    use crate::revenue::RevenueNormalizer;
    use crate::types::{FeedbackItem, SLOTS_PER_EVENT};

    fn aggregate() -> FeedbackAggregate {
        let items: Vec<FeedbackItem> = (0..SLOTS_PER_EVENT)
            .map(|i| FeedbackItem {
                event_id: 7,
                respondent_id: format!("R-{i:06}"),
                text: "Great speakers and tasty food".to_string(),
                rating: Some(4),
                submitted_at: Utc::now(),
            })
            .collect();
        FeedbackAnalyzer::new().analyze(&items).unwrap()
    }

    #[test]
    fn value_is_exact_half_half_blend() {
        let agg = aggregate();
        let rev = RevenueNormalizer::default().assess(5000.0, 100, &[]);
        let out = ScoreComposer::new().compose(7, &agg, &rev, &Model::untrained());
        assert_eq!(
            out.value_score,
            0.5 * out.feedback_score + 0.5 * out.revenue_score
        );
        assert_eq!(out.explanation.weights.feedback, 0.5);
        assert_eq!(out.explanation.weights.revenue, 0.5);
        assert_eq!(out.explanation.feedback.method, ScoringMethod::Rubric);
        assert_eq!(out.model_version, 0);
    }

    #[test]
    fn learned_model_switches_method_and_version() {
        let agg = aggregate();
        let rev = RevenueNormalizer::default().assess(5000.0, 100, &[]);
        let model = Model::learned(
            2,
            LearnedWeights {
                intercept: 60.0,
                coefficients: vec![0.0; FeatureVector::LEN],
            },
            5,
        );
        let out = ScoreComposer::new().compose(7, &agg, &rev, &model);
        assert_eq!(out.explanation.feedback.method, ScoringMethod::Learned);
        assert_eq!(out.model_version, 2);
        assert_eq!(out.feedback_score, 60.0);
        assert_eq!(out.value_score, 55.0);
    }

    #[test]
    fn explanation_json_shape() {
        let agg = aggregate();
        let rev = RevenueNormalizer::default().assess(5000.0, 100, &[]);
        let out = ScoreComposer::new().compose(7, &agg, &rev, &Model::untrained());
        let v = serde_json::to_value(&out.explanation).unwrap();
        assert_eq!(v["feedback"]["method"], "rubric");
        assert_eq!(v["revenue"]["normalization"], "default");
        assert_eq!(v["revenue"]["revenue_per_attendee"], 50.0);
        assert!(v["revenue"].get("revenue_score").is_none());
        assert!(v["feedback"]["category_breakdown"].get("food").is_some());
    }
}
