//! # Calibration Engine
//! Stores administrator ground-truth labels and refits the feedback model.
//!
//! Every accepted label triggers a full refit over all labeled events once
//! [`MIN_LABELS_FOR_TRAINING`] is reached. Fits run outside the registry
//! lock (scoring keeps the previous model meanwhile) and are serialized by a
//! dedicated training mutex. A numeric failure keeps the previous model.

use chrono::Utc;
use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::feedback::FeatureVector;
use crate::registry::{ModelRegistry, MIN_LABELS_FOR_TRAINING};
use crate::regression::{fit_ridge, FitError};
use crate::types::{CalibrationLabel, EventId};

pub const DEFAULT_RIDGE_LAMBDA: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub enum RetrainOutcome {
    /// Not enough labeled events yet; not an error.
    Deferred { needs_more: usize },
    Installed { version: u64, trained_on: usize },
    /// Fit failed; `kept_version` is still active.
    Failed { kept_version: u64, error: FitError },
}

/// Response for a label submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub message: String,
    pub retrained: bool,
    pub version: u64,
    pub trained_on: usize,
    pub total_labels: usize,
    pub needs_more: usize,
}

#[derive(Debug)]
pub struct CalibrationEngine {
    registry: ModelRegistry,
    lambda: f64,
    train_lock: Mutex<()>,
}

impl CalibrationEngine {
    pub fn new(registry: ModelRegistry, lambda: f64) -> Self {
        Self {
            registry,
            lambda: if lambda.is_finite() && lambda >= 0.0 {
                lambda
            } else {
                DEFAULT_RIDGE_LAMBDA
            },
            train_lock: Mutex::new(()),
        }
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Validate and store a label for an event that already has a score
    /// (the caller checks that), then retrain if enough labels exist.
    pub fn submit(
        &self,
        event_id: EventId,
        features: &FeatureVector,
        admin_label: f64,
    ) -> EngineResult<CalibrationReport> {
        validate_label(admin_label)?;

        let total = self.registry.upsert_example(
            features.clone(),
            CalibrationLabel {
                event_id,
                admin_label,
                labeled_at: Utc::now(),
            },
        );
        counter!("calibration_labels_total").increment(1);
        info!(target: "calibration", event_id, admin_label, total_labels = total, "label stored");

        let outcome = self.retrain();
        let status = self.registry.status();

        let message = match &outcome {
            RetrainOutcome::Deferred { needs_more } => format!(
                "Calibration saved; {needs_more} more labeled event(s) needed before training"
            ),
            RetrainOutcome::Installed {
                version,
                trained_on,
            } => format!(
                "Calibration saved and model retrained (version {version}, trained on {trained_on} events)"
            ),
            RetrainOutcome::Failed { kept_version, .. } => format!(
                "Calibration saved; retraining failed, keeping model version {kept_version}"
            ),
        };

        Ok(CalibrationReport {
            message,
            retrained: matches!(outcome, RetrainOutcome::Installed { .. }),
            version: status.version,
            trained_on: status.trained_on,
            total_labels: status.total_labels,
            needs_more: status.needs_more,
        })
    }

    /// Full refit over every labeled event.
    pub fn retrain(&self) -> RetrainOutcome {
        let _guard = self.train_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let examples = self.registry.training_set();
        if examples.len() < MIN_LABELS_FOR_TRAINING {
            return RetrainOutcome::Deferred {
                needs_more: MIN_LABELS_FOR_TRAINING - examples.len(),
            };
        }

        let rows: Vec<Vec<f64>> = examples.iter().map(|e| e.features.values()).collect();
        let targets: Vec<f64> = examples.iter().map(|e| e.label.admin_label).collect();

        match fit_ridge(&rows, &targets, self.lambda) {
            Ok(weights) => {
                let model = self.registry.install(weights, examples.len());
                counter!("model_retrains_total").increment(1);
                gauge!("model_version").set(model.version as f64);
                info!(
                    target: "calibration",
                    version = model.version,
                    trained_on = model.trained_on,
                    "model installed"
                );
                RetrainOutcome::Installed {
                    version: model.version,
                    trained_on: model.trained_on,
                }
            }
            Err(error) => {
                let kept_version = self.registry.active().version;
                counter!("model_retrain_failures_total").increment(1);
                warn!(
                    target: "calibration",
                    %error,
                    kept_version,
                    examples = examples.len(),
                    "retrain failed; keeping previous model"
                );
                RetrainOutcome::Failed {
                    kept_version,
                    error,
                }
            }
        }
    }
}

pub fn validate_label(admin_label: f64) -> EngineResult<()> {
    if !admin_label.is_finite() || !(0.0..=100.0).contains(&admin_label) {
        return Err(EngineError::Validation(format!(
            "admin_label must be between 0 and 100, got {admin_label}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScoringMethod;
    use crate::taxonomy::Category;

    fn features(seed: usize) -> FeatureVector {
        FeatureVector {
            sentiment_avg: (seed as f64 * 0.37).sin(),
            rating: 1.0 + (seed % 5) as f64,
            categories: Category::ALL
                .iter()
                .map(|&c| (c, ((seed * 13 + c.index() * 7) % 30) as f64 * 100.0 / 30.0))
                .collect(),
        }
    }

    #[test]
    fn rejects_out_of_range_labels_without_storing() {
        let reg = ModelRegistry::new();
        let cal = CalibrationEngine::new(reg.clone(), 1.0);
        for bad in [-0.5, 100.5, f64::NAN] {
            let err = cal.submit(1, &features(1), bad).unwrap_err();
            assert!(matches!(err, EngineError::Validation(_)));
        }
        assert_eq!(reg.total_labels(), 0);
    }

    #[test]
    fn trains_on_fifth_label() {
        let reg = ModelRegistry::new();
        let cal = CalibrationEngine::new(reg.clone(), 1.0);
        for id in 1..=4u64 {
            let r = cal.submit(id, &features(id as usize), 20.0 * id as f64).unwrap();
            assert!(!r.retrained);
            assert_eq!(r.version, 0);
        }
        assert_eq!(reg.status().needs_more, 1);
        assert_eq!(reg.status().status, ScoringMethod::Rubric);

        let r = cal.submit(5, &features(5), 90.0).unwrap();
        assert!(r.retrained);
        assert_eq!(r.version, 1);
        assert_eq!(r.trained_on, 5);
        assert_eq!(r.needs_more, 0);
        assert_eq!(reg.status().status, ScoringMethod::Learned);
    }

    #[test]
    fn relabel_refits_and_bumps_version() {
        let reg = ModelRegistry::new();
        let cal = CalibrationEngine::new(reg.clone(), 1.0);
        for id in 1..=5u64 {
            cal.submit(id, &features(id as usize), 50.0).unwrap();
        }
        let r = cal.submit(3, &features(3), 10.0).unwrap();
        assert_eq!(r.version, 2);
        assert_eq!(r.trained_on, 5);
        assert_eq!(r.total_labels, 5);
    }

    #[test]
    fn singular_fit_keeps_previous_model() {
        let reg = ModelRegistry::new();
        // No ridge term and identical features: the normal equations are singular.
        let cal = CalibrationEngine::new(reg.clone(), 0.0);
        let mut last = None;
        for id in 1..=5u64 {
            last = Some(cal.submit(id, &features(1), 10.0 * id as f64).unwrap());
        }
        let r = last.unwrap();
        assert!(!r.retrained);
        assert_eq!(r.version, 0);
        assert!(r.message.contains("keeping model version 0"));
        assert_eq!(reg.status().status, ScoringMethod::Rubric);
    }

    #[test]
    fn invalid_lambda_falls_back_to_default() {
        let cal = CalibrationEngine::new(ModelRegistry::new(), f64::NAN);
        assert_eq!(cal.lambda(), DEFAULT_RIDGE_LAMBDA);
    }
}
