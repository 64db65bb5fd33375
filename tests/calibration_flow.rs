// tests/calibration_flow.rs
//
// Labels → model switch, through the engine facade.
//
// Covered:
// - 4 labels keep the rubric (needs_more = 1), the 5th trains version 1
// - scores computed after training report the learned method and version
// - relabeling refits without growing the label count
// - deleting a labeled event drops its label but never reverts the model
// - concurrent label submissions all land

use std::sync::Arc;
use std::thread;

use event_value_engine::engine::{FeedbackSubmission, LabelSubmission, NewEvent};
use event_value_engine::model::ScoringMethod;
use event_value_engine::registry::MIN_LABELS_FOR_TRAINING;
use event_value_engine::types::EventId;
use event_value_engine::{EngineError, ValueEngine};

const TEXTS: &[&str] = &[
    "Great speakers and a lovely venue",
    "The food was cold and bland",
    "Registration was chaotic and slow",
    "Friendly community, fun atmosphere",
    "Tickets were expensive for what we got",
    "Amazing program, loved every talk",
    "Crowded hall and a boring schedule",
];

/// Create and fully score an event; `seed` varies the feedback mix.
fn scored_event(engine: &ValueEngine, seed: usize) -> EventId {
    let id = engine
        .create_event(NewEvent {
            name: format!("Event {seed}"),
            attendance: 40 + seed as i64 * 10,
            revenue: 800.0 + seed as f64 * 450.0,
        })
        .expect("create")
        .id;
    let slots = engine.list_slots(id).expect("slots").respondents;
    for (i, slot) in slots.iter().enumerate() {
        let text = TEXTS[(i * (seed + 1) + seed) % TEXTS.len()];
        let rating = if (i + seed) % 3 == 0 {
            None
        } else {
            Some(((i + seed) % 5 + 1) as i64)
        };
        engine
            .submit_feedback(
                id,
                slot,
                FeedbackSubmission {
                    text: text.to_string(),
                    rating,
                },
            )
            .expect("submit");
    }
    engine.compute_score(id).expect("score");
    id
}

fn label(engine: &ValueEngine, id: EventId, value: f64) {
    engine
        .submit_label(id, LabelSubmission { admin_label: value })
        .expect("label");
}

#[test]
fn fifth_label_switches_to_learned() {
    let engine = ValueEngine::default();
    let ids: Vec<EventId> = (0..MIN_LABELS_FOR_TRAINING).map(|s| scored_event(&engine, s)).collect();

    for (i, id) in ids.iter().take(MIN_LABELS_FOR_TRAINING - 1).enumerate() {
        label(&engine, *id, 30.0 + i as f64 * 12.0);
    }
    let status = engine.model_status();
    assert_eq!(status.status, ScoringMethod::Rubric);
    assert_eq!(status.version, 0);
    assert_eq!(status.total_labels, 4);
    assert_eq!(status.needs_more, 1);

    let report = engine
        .submit_label(ids[4], LabelSubmission { admin_label: 85.0 })
        .unwrap();
    assert!(report.retrained);
    assert_eq!(report.version, 1);
    assert_eq!(report.trained_on, 5);

    let status = engine.model_status();
    assert_eq!(status.status, ScoringMethod::Learned);
    assert_eq!(status.version, 1);
    assert_eq!(status.trained_on, 5);
    assert_eq!(status.needs_more, 0);
    assert!(status.fitted_at.is_some());

    let rec = engine.compute_score(ids[0]).unwrap();
    assert_eq!(rec.outcome.model_version, 1);
    assert_eq!(rec.outcome.explanation.feedback.method, ScoringMethod::Learned);
    assert!((0.0..=100.0).contains(&rec.outcome.feedback_score));
}

#[test]
fn relabel_overwrites_and_refits() {
    let engine = ValueEngine::default();
    let ids: Vec<EventId> = (0..5).map(|s| scored_event(&engine, s)).collect();
    for (i, id) in ids.iter().enumerate() {
        label(&engine, *id, 20.0 + i as f64 * 15.0);
    }
    assert_eq!(engine.model_status().version, 1);

    let report = engine
        .submit_label(ids[2], LabelSubmission { admin_label: 5.0 })
        .unwrap();
    assert_eq!(report.total_labels, 5);
    assert_eq!(report.version, 2);
    assert_eq!(engine.registry().label_for(ids[2]).unwrap().admin_label, 5.0);
}

#[test]
fn deleting_labeled_event_keeps_active_model() {
    let engine = ValueEngine::default();
    let ids: Vec<EventId> = (0..5).map(|s| scored_event(&engine, s)).collect();
    for id in &ids {
        label(&engine, *id, 60.0);
    }
    assert_eq!(engine.model_status().status, ScoringMethod::Learned);

    engine.delete_event(ids[0]).unwrap();
    let status = engine.model_status();
    assert_eq!(status.total_labels, 4);
    assert_eq!(status.status, ScoringMethod::Learned);
    assert_eq!(status.version, 1);
    assert!(engine.registry().label_for(ids[0]).is_none());

    // A new 5th label refits on the remaining examples.
    let extra = scored_event(&engine, 9);
    let report = engine
        .submit_label(extra, LabelSubmission { admin_label: 40.0 })
        .unwrap();
    assert_eq!(report.version, 2);
    assert_eq!(report.trained_on, 5);
}

#[test]
fn label_validation_and_preconditions() {
    let engine = ValueEngine::default();
    let id = scored_event(&engine, 1);

    for bad in [-1.0, 100.5, f64::NAN] {
        let err = engine
            .submit_label(id, LabelSubmission { admin_label: bad })
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{bad}");
    }

    let unscored = engine
        .create_event(NewEvent {
            name: "Unscored".into(),
            attendance: 10,
            revenue: 100.0,
        })
        .unwrap()
        .id;
    let err = engine
        .submit_label(unscored, LabelSubmission { admin_label: 50.0 })
        .unwrap_err();
    assert!(matches!(err, EngineError::Precondition(_)));
    assert_eq!(engine.model_status().total_labels, 0);
}

#[test]
fn concurrent_labels_all_recorded() {
    let engine = Arc::new(ValueEngine::default());
    let ids: Vec<EventId> = (0..8).map(|s| scored_event(&engine, s)).collect();

    let handles: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine
                    .submit_label(id, LabelSubmission { admin_label: 10.0 * i as f64 })
                    .unwrap()
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let status = engine.model_status();
    assert_eq!(status.total_labels, 8);
    assert_eq!(status.status, ScoringMethod::Learned);
    // At least submissions 5..=8 install a model; the last refit sees all 8.
    assert!(status.version >= 4, "version {}", status.version);
    assert_eq!(status.trained_on, 8);
}
