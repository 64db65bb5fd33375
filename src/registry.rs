//! # Model Registry
//! Holds the single active [`Model`] and the labeled examples it is trained
//! from. Cloneable handle over one `RwLock`:
//! - readers take an `Arc<Model>` snapshot and release the lock immediately
//! - installs replace the whole `Arc` under the write lock
//!
//! A reader therefore sees either the old or the new model, never a mix.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::feedback::FeatureVector;
use crate::model::{LearnedWeights, Model, ScoringMethod};
use crate::types::{CalibrationLabel, EventId};

/// Distinct labeled events required before the first fit.
pub const MIN_LABELS_FOR_TRAINING: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub features: FeatureVector,
    pub label: CalibrationLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub status: ScoringMethod,
    pub version: u64,
    pub trained_on: usize,
    pub total_labels: usize,
    pub needs_more: usize,
    pub fitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct RegistryState {
    active: Arc<Model>,
    examples: BTreeMap<EventId, TrainingExample>,
}

#[derive(Clone, Debug)]
pub struct ModelRegistry {
    inner: Arc<RwLock<RegistryState>>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// Version 0, rubric mode, no labels.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryState {
                active: Arc::new(Model::untrained()),
                examples: BTreeMap::new(),
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the active model.
    pub fn active(&self) -> Arc<Model> {
        self.read().active.clone()
    }

    pub fn status(&self) -> ModelStatus {
        let g = self.read();
        let total_labels = g.examples.len();
        ModelStatus {
            status: if g.active.is_learned() {
                ScoringMethod::Learned
            } else {
                ScoringMethod::Rubric
            },
            version: g.active.version,
            trained_on: g.active.trained_on,
            total_labels,
            needs_more: MIN_LABELS_FOR_TRAINING.saturating_sub(total_labels),
            fitted_at: g.active.fitted_at,
        }
    }

    /// Insert or overwrite the example for `label.event_id`; returns the
    /// number of distinct labeled events afterwards.
    pub fn upsert_example(&self, features: FeatureVector, label: CalibrationLabel) -> usize {
        let mut g = self.write();
        g.examples
            .insert(label.event_id, TrainingExample { features, label });
        g.examples.len()
    }

    /// Keep a labeled example in sync with a recomputed score.
    pub fn refresh_features(&self, event_id: EventId, features: &FeatureVector) {
        let mut g = self.write();
        if let Some(ex) = g.examples.get_mut(&event_id) {
            ex.features = features.clone();
        }
    }

    /// Drop the example of a deleted event. The active model is kept.
    pub fn remove_example(&self, event_id: EventId) -> bool {
        self.write().examples.remove(&event_id).is_some()
    }

    pub fn label_for(&self, event_id: EventId) -> Option<CalibrationLabel> {
        self.read().examples.get(&event_id).map(|e| e.label.clone())
    }

    pub fn total_labels(&self) -> usize {
        self.read().examples.len()
    }

    /// All examples, ordered by event id.
    pub fn training_set(&self) -> Vec<TrainingExample> {
        self.read().examples.values().cloned().collect()
    }

    /// Atomically replace the active model with freshly fitted weights.
    /// The new version is always previous + 1.
    pub fn install(&self, weights: LearnedWeights, trained_on: usize) -> Arc<Model> {
        let mut g = self.write();
        let next = Arc::new(Model::learned(g.active.version + 1, weights, trained_on));
        g.active = next.clone();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Category;
    use std::thread;

    fn features(x: f64) -> FeatureVector {
        FeatureVector {
            sentiment_avg: x,
            rating: 3.0,
            categories: Category::ALL.iter().map(|&c| (c, 0.0)).collect(),
        }
    }

    fn label(event_id: EventId, v: f64) -> CalibrationLabel {
        CalibrationLabel {
            event_id,
            admin_label: v,
            labeled_at: Utc::now(),
        }
    }

    fn weights() -> LearnedWeights {
        LearnedWeights {
            intercept: 1.0,
            coefficients: vec![0.0; FeatureVector::LEN],
        }
    }

    #[test]
    fn initial_state_is_rubric() {
        let r = ModelRegistry::new();
        let s = r.status();
        assert_eq!(s.status, ScoringMethod::Rubric);
        assert_eq!(s.version, 0);
        assert_eq!(s.trained_on, 0);
        assert_eq!(s.total_labels, 0);
        assert_eq!(s.needs_more, MIN_LABELS_FOR_TRAINING);
        assert!(s.fitted_at.is_none());
    }

    #[test]
    fn upsert_overwrites_per_event() {
        let r = ModelRegistry::new();
        assert_eq!(r.upsert_example(features(0.1), label(1, 40.0)), 1);
        assert_eq!(r.upsert_example(features(0.1), label(1, 90.0)), 1);
        assert_eq!(r.upsert_example(features(0.2), label(2, 10.0)), 2);
        assert_eq!(r.label_for(1).map(|l| l.admin_label), Some(90.0));
        assert_eq!(r.status().needs_more, 3);
    }

    #[test]
    fn install_bumps_version_and_old_snapshots_stay_valid() {
        let r = ModelRegistry::new();
        let before = r.active();
        let m1 = r.install(weights(), 5);
        let m2 = r.install(weights(), 6);
        assert_eq!(before.version, 0);
        assert!(!before.is_learned());
        assert_eq!(m1.version, 1);
        assert_eq!(m2.version, 2);
        assert_eq!(r.status().status, ScoringMethod::Learned);
        assert_eq!(r.status().trained_on, 6);
    }

    #[test]
    fn removing_examples_never_reverts_to_rubric() {
        let r = ModelRegistry::new();
        for id in 1..=5 {
            r.upsert_example(features(id as f64 / 10.0), label(id, 50.0));
        }
        r.install(weights(), 5);
        assert!(r.remove_example(3));
        assert!(!r.remove_example(3));
        let s = r.status();
        assert_eq!(s.status, ScoringMethod::Learned);
        assert_eq!(s.total_labels, 4);
        assert_eq!(s.needs_more, 1);
    }

    #[test]
    fn concurrent_readers_see_whole_models() {
        let r = ModelRegistry::new();
        thread::scope(|s| {
            for _ in 0..4 {
                let r = r.clone();
                s.spawn(move || {
                    for _ in 0..200 {
                        let m = r.active();
                        assert_eq!(m.is_learned(), m.version > 0);
                        assert_eq!(m.is_learned(), m.fitted_at.is_some());
                    }
                });
            }
            for _ in 0..20 {
                r.install(weights(), 5);
            }
        });
        assert_eq!(r.active().version, 20);
    }
}
