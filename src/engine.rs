//! # Value Engine
//! Facade over the store, the scoring pipeline and calibration. Every
//! operation validates its input before touching state and returns a typed
//! [`EngineError`] on failure.
//!
//! Pipeline for a score request:
//! 1) snapshot event, feedback and prior revenue benchmarks from the store
//! 2) analyze feedback and normalize revenue (independent of each other)
//! 3) take one model snapshot from the registry and compose
//! 4) cache the record and refresh the calibration example, if any

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use metrics::counter;
use serde::Deserialize;
use tracing::{debug, info};

use crate::calibration::{CalibrationEngine, CalibrationReport};
use crate::composer::{ScoreComposer, ScoreRecord};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::feedback::FeedbackAnalyzer;
use crate::history::{build_history, HistoryEntry, HistorySort};
use crate::registry::{ModelRegistry, ModelStatus};
use crate::revenue::RevenueNormalizer;
use crate::store::{EventStore, EventSummary, SlotListing, SubmissionReceipt};
use crate::text::anon_hash;
use crate::types::{EventId, FeedbackItem, SLOTS_PER_EVENT};

pub const MIN_FEEDBACK_CHARS: usize = 10;
pub const MAX_EVENT_NAME_CHARS: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub attendance: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackSubmission {
    pub text: String,
    #[serde(default)]
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelSubmission {
    pub admin_label: f64,
}

#[derive(Debug)]
pub struct ValueEngine {
    store: EventStore,
    registry: ModelRegistry,
    analyzer: FeedbackAnalyzer,
    normalizer: RevenueNormalizer,
    composer: ScoreComposer,
    calibration: CalibrationEngine,
    /// Held by label submission and deletion so a label never outlives its event.
    label_gate: Mutex<()>,
}

impl Default for ValueEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl ValueEngine {
    pub fn new(config: &EngineConfig) -> Self {
        let registry = ModelRegistry::new();
        Self {
            store: EventStore::new(),
            calibration: CalibrationEngine::new(registry.clone(), config.scoring.ridge_lambda),
            registry,
            analyzer: FeedbackAnalyzer::new(),
            normalizer: RevenueNormalizer::new(
                config.scoring.default_min_benchmark,
                config.scoring.default_max_benchmark,
            ),
            composer: ScoreComposer::new(),
            label_gate: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn create_event(&self, req: NewEvent) -> EngineResult<EventSummary> {
        let name = req.name.trim().to_string();
        let name_len = name.chars().count();
        if name_len == 0 || name_len > MAX_EVENT_NAME_CHARS {
            return Err(EngineError::Validation(format!(
                "name must be 1-{MAX_EVENT_NAME_CHARS} characters"
            )));
        }
        let attendance = u32::try_from(req.attendance)
            .ok()
            .filter(|a| *a >= 1)
            .ok_or_else(|| {
                EngineError::Validation(format!(
                    "attendance must be at least 1, got {}",
                    req.attendance
                ))
            })?;
        if !req.revenue.is_finite() || req.revenue < 0.0 {
            return Err(EngineError::Validation(format!(
                "revenue must be a non-negative number, got {}",
                req.revenue
            )));
        }

        let event = self.store.create_event(name, attendance, req.revenue);
        info!(target: "events", event_id = event.id, attendance, "event created");
        self.store.get_event(event.id)
    }

    pub fn get_event(&self, id: EventId) -> EngineResult<EventSummary> {
        self.store.get_event(id)
    }

    pub fn list_events(&self) -> Vec<EventSummary> {
        self.store.list_events()
    }

    pub fn find_event_by_name(&self, name: &str) -> Option<EventId> {
        self.store.find_by_name(name)
    }

    /// Removes the event, its feedback, slots, score and calibration label.
    pub fn delete_event(&self, id: EventId) -> EngineResult<()> {
        let _gate = self.label_gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.delete_event(id)?;
        let had_label = self.registry.remove_example(id);
        info!(target: "events", event_id = id, had_label, "event deleted");
        Ok(())
    }

    pub fn list_slots(&self, id: EventId) -> EngineResult<SlotListing> {
        self.store.slots(id)
    }

    pub fn list_feedback(&self, id: EventId) -> EngineResult<Vec<FeedbackItem>> {
        self.store.feedback(id)
    }

    pub fn submit_feedback(
        &self,
        id: EventId,
        respondent_id: &str,
        req: FeedbackSubmission,
    ) -> EngineResult<SubmissionReceipt> {
        let text = req.text.trim().to_string();
        if text.chars().count() < MIN_FEEDBACK_CHARS {
            return Err(EngineError::Validation(format!(
                "feedback text must be at least {MIN_FEEDBACK_CHARS} characters"
            )));
        }
        let rating = match req.rating {
            None => None,
            Some(r) if (1..=5).contains(&r) => Some(r as u8),
            Some(r) => {
                return Err(EngineError::Validation(format!(
                    "rating must be between 1 and 5, got {r}"
                )))
            }
        };

        let text_id = anon_hash(&text);
        let receipt = self.store.submit_feedback(id, respondent_id, text, rating)?;
        counter!("feedback_submissions_total").increment(1);
        debug!(
            target: "feedback",
            event_id = id,
            respondent = %respondent_id,
            %text_id,
            remaining = receipt.remaining,
            "feedback accepted"
        );
        Ok(receipt)
    }

    /// Compute (or recompute) and cache the event's score.
    pub fn compute_score(&self, id: EventId) -> EngineResult<ScoreRecord> {
        let inputs = self.store.scoring_inputs(id)?;
        if inputs.feedback.len() < SLOTS_PER_EVENT {
            return Err(EngineError::Precondition(format!(
                "need {} feedbacks, only have {}",
                SLOTS_PER_EVENT,
                inputs.feedback.len()
            )));
        }

        let aggregate = self.analyzer.analyze(&inputs.feedback)?;
        let revenue = self.normalizer.assess(
            inputs.event.revenue,
            inputs.event.attendance,
            &inputs.prior_rpa,
        );
        let model = self.registry.active();
        let outcome = self.composer.compose(id, &aggregate, &revenue, &model);
        let record = ScoreRecord {
            outcome,
            computed_at: Utc::now(),
        };

        self.store.store_score(record.clone())?;
        self.registry
            .refresh_features(id, &record.outcome.feature_vector);

        counter!("value_scores_computed_total").increment(1);
        info!(
            target: "scoring",
            event_id = id,
            value_score = record.outcome.value_score,
            feedback_score = record.outcome.feedback_score,
            revenue_score = record.outcome.revenue_score,
            model_version = record.outcome.model_version,
            "score computed"
        );
        Ok(record)
    }

    pub fn cached_score(&self, id: EventId) -> EngineResult<ScoreRecord> {
        self.store.score(id)
    }

    pub fn history(&self, sort: HistorySort) -> Vec<HistoryEntry> {
        build_history(&self.store.scored_events(), sort)
    }

    pub fn submit_label(&self, id: EventId, req: LabelSubmission) -> EngineResult<CalibrationReport> {
        crate::calibration::validate_label(req.admin_label)?;
        let _gate = self.label_gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.get_event(id)?;
        let record = self.store.score(id).map_err(|_| {
            EngineError::Precondition(format!(
                "compute the score of event {id} before calibrating"
            ))
        })?;
        self.calibration
            .submit(id, &record.outcome.feature_vector, req.admin_label)
    }

    pub fn model_status(&self) -> ModelStatus {
        self.registry.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn new_event(engine: &ValueEngine, attendance: i64, revenue: f64) -> EventId {
        engine
            .create_event(NewEvent {
                name: "Spring Mixer".into(),
                attendance,
                revenue,
            })
            .unwrap()
            .id
    }

    #[test]
    fn create_event_validation() {
        let engine = ValueEngine::default();
        for (name, attendance, revenue) in [
            ("", 10, 10.0),
            ("ok", 0, 10.0),
            ("ok", -4, 10.0),
            ("ok", 10, -1.0),
            ("ok", 10, f64::INFINITY),
        ] {
            let err = engine
                .create_event(NewEvent {
                    name: name.into(),
                    attendance,
                    revenue,
                })
                .unwrap_err();
            assert!(matches!(err, EngineError::Validation(_)), "{name} {attendance} {revenue}");
        }
        assert!(engine.list_events().is_empty());
    }

    #[test]
    fn feedback_validation_happens_before_slot_use() {
        let engine = ValueEngine::default();
        let id = new_event(&engine, 10, 100.0);
        let slot = engine.list_slots(id).unwrap().respondents[0].clone();

        let short = FeedbackSubmission {
            text: "  too short ".into(),
            rating: None,
        };
        assert!(matches!(
            engine.submit_feedback(id, &slot, short),
            Err(EngineError::Validation(_))
        ));
        let bad_rating = FeedbackSubmission {
            text: "Perfectly long enough text".into(),
            rating: Some(6),
        };
        assert!(matches!(
            engine.submit_feedback(id, &slot, bad_rating),
            Err(EngineError::Validation(_))
        ));
        assert_eq!(engine.list_slots(id).unwrap().submitted, 0);
    }

    #[test]
    fn label_before_score_is_precondition() {
        let engine = ValueEngine::default();
        let id = new_event(&engine, 10, 100.0);
        let err = engine
            .submit_label(id, LabelSubmission { admin_label: 70.0 })
            .unwrap_err();
        assert!(matches!(err, EngineError::Precondition(_)));
        let err = engine
            .submit_label(4242, LabelSubmission { admin_label: 70.0 })
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert_eq!(engine.model_status().total_labels, 0);
    }

    fn scored_event(engine: &ValueEngine) -> EventId {
        let id = new_event(engine, 40, 1200.0);
        for slot in engine.list_slots(id).unwrap().respondents {
            engine
                .submit_feedback(
                    id,
                    &slot,
                    FeedbackSubmission {
                        text: "Friendly crowd and a great venue".into(),
                        rating: Some(4),
                    },
                )
                .unwrap();
        }
        engine.compute_score(id).unwrap();
        id
    }

    #[test]
    fn delete_waits_for_in_flight_label() {
        let engine = ValueEngine::default();
        let id = scored_event(&engine);
        let features = engine.cached_score(id).unwrap().outcome.feature_vector;

        thread::scope(|s| {
            // Label has passed its score check but not yet stored the example.
            let gate = engine.label_gate.lock().unwrap();
            let deleter = s.spawn(|| engine.delete_event(id));
            thread::sleep(Duration::from_millis(20));
            assert!(engine.get_event(id).is_ok(), "delete ran while a label was in flight");

            engine.calibration.submit(id, &features, 60.0).unwrap();
            assert!(engine.registry.label_for(id).is_some());
            drop(gate);

            deleter.join().unwrap().unwrap();
        });

        assert!(engine.registry.label_for(id).is_none());
        assert_eq!(engine.model_status().total_labels, 0);
        assert!(matches!(engine.get_event(id), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn label_after_delete_is_not_found() {
        let engine = ValueEngine::default();
        let id = scored_event(&engine);
        engine.delete_event(id).unwrap();
        let err = engine
            .submit_label(id, LabelSubmission { admin_label: 50.0 })
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert_eq!(engine.model_status().total_labels, 0);
    }
}
