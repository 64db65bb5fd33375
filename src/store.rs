//! In-memory bookkeeping: events, respondent slots, feedback and cached scores.
//!
//! One mutex guards everything; each operation validates first and writes
//! last, so a failed call leaves the store untouched. Filling a slot is a
//! compare-and-set under that mutex: concurrent submissions for the same
//! slot produce exactly one success.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::composer::ScoreRecord;
use crate::error::{EngineError, EngineResult};
use crate::types::{Event, EventId, FeedbackItem, RespondentSlot, SLOTS_PER_EVENT};

const SLOT_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SLOT_ID_LEN: usize = 6;

#[derive(Debug)]
struct EventEntry {
    event: Event,
    /// Generated on first access, then fixed.
    slots: Option<Vec<RespondentSlot>>,
    feedback: Vec<FeedbackItem>,
    score: Option<ScoreRecord>,
}

impl EventEntry {
    fn summary(&self) -> EventSummary {
        EventSummary {
            id: self.event.id,
            name: self.event.name.clone(),
            attendance: self.event.attendance,
            revenue: self.event.revenue,
            feedback_count: self.feedback.len(),
            has_score: self.score.is_some(),
            created_at: self.event.created_at,
        }
    }

    fn slots_mut(&mut self) -> &mut Vec<RespondentSlot> {
        self.slots.get_or_insert_with(generate_slots)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: EventId,
    events: BTreeMap<EventId, EventEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub id: EventId,
    pub name: String,
    pub attendance: u32,
    pub revenue: f64,
    pub feedback_count: usize,
    pub has_score: bool,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotListing {
    pub respondents: Vec<String>,
    pub submitted: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub respondent_id: String,
    pub total_feedbacks: usize,
    pub remaining: usize,
}

/// Snapshot handed to the scoring pipeline.
#[derive(Debug, Clone)]
pub struct ScoringInputs {
    pub event: Event,
    pub feedback: Vec<FeedbackItem>,
    /// Revenue-per-attendee of every other scored event.
    pub prior_rpa: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct EventStore {
    inner: Mutex<StoreState>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inputs are validated by the caller.
    pub fn create_event(&self, name: String, attendance: u32, revenue: f64) -> Event {
        let mut g = self.lock();
        g.next_id += 1;
        let event = Event {
            id: g.next_id,
            name,
            attendance,
            revenue,
            created_at: Utc::now(),
        };
        g.events.insert(
            event.id,
            EventEntry {
                event: event.clone(),
                slots: None,
                feedback: Vec::new(),
                score: None,
            },
        );
        event
    }

    /// Removes the event with its slots, feedback and cached score.
    pub fn delete_event(&self, id: EventId) -> EngineResult<Event> {
        self.lock()
            .events
            .remove(&id)
            .map(|e| e.event)
            .ok_or_else(|| event_not_found(id))
    }

    pub fn get_event(&self, id: EventId) -> EngineResult<EventSummary> {
        self.lock()
            .events
            .get(&id)
            .map(EventEntry::summary)
            .ok_or_else(|| event_not_found(id))
    }

    /// Newest first.
    pub fn list_events(&self) -> Vec<EventSummary> {
        let g = self.lock();
        let mut out: Vec<EventSummary> = g.events.values().map(EventEntry::summary).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out
    }

    pub fn find_by_name(&self, name: &str) -> Option<EventId> {
        self.lock()
            .events
            .values()
            .find(|e| e.event.name == name)
            .map(|e| e.event.id)
    }

    pub fn slots(&self, id: EventId) -> EngineResult<SlotListing> {
        let mut g = self.lock();
        let entry = g.events.get_mut(&id).ok_or_else(|| event_not_found(id))?;
        let slots = entry.slots_mut();
        let submitted = slots.iter().filter(|s| s.is_filled()).count();
        Ok(SlotListing {
            respondents: slots.iter().map(|s| s.id.clone()).collect(),
            submitted,
            remaining: SLOTS_PER_EVENT - submitted,
        })
    }

    pub fn feedback(&self, id: EventId) -> EngineResult<Vec<FeedbackItem>> {
        self.lock()
            .events
            .get(&id)
            .map(|e| e.feedback.clone())
            .ok_or_else(|| event_not_found(id))
    }

    /// Fill `respondent_id` exactly once. Text and rating are validated by the caller.
    pub fn submit_feedback(
        &self,
        id: EventId,
        respondent_id: &str,
        text: String,
        rating: Option<u8>,
    ) -> EngineResult<SubmissionReceipt> {
        let mut g = self.lock();
        let entry = g.events.get_mut(&id).ok_or_else(|| event_not_found(id))?;

        if entry.feedback.len() >= SLOTS_PER_EVENT {
            return Err(EngineError::Conflict(format!(
                "all {SLOTS_PER_EVENT} feedback slots of event {id} are filled"
            )));
        }

        let now = Utc::now();
        let slot = entry
            .slots_mut()
            .iter_mut()
            .find(|s| s.id == respondent_id)
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "respondent slot '{respondent_id}' does not belong to event {id}"
                ))
            })?;
        if slot.is_filled() {
            return Err(EngineError::Conflict(format!(
                "feedback already submitted for respondent '{respondent_id}'"
            )));
        }
        slot.filled_at = Some(now);

        entry.feedback.push(FeedbackItem {
            event_id: id,
            respondent_id: respondent_id.to_string(),
            text,
            rating,
            submitted_at: now,
        });

        let total = entry.feedback.len();
        Ok(SubmissionReceipt {
            respondent_id: respondent_id.to_string(),
            total_feedbacks: total,
            remaining: SLOTS_PER_EVENT - total,
        })
    }

    pub fn scoring_inputs(&self, id: EventId) -> EngineResult<ScoringInputs> {
        let g = self.lock();
        let entry = g.events.get(&id).ok_or_else(|| event_not_found(id))?;
        let prior_rpa = g
            .events
            .values()
            .filter(|e| e.event.id != id)
            .filter_map(|e| e.score.as_ref())
            .map(|s| s.outcome.explanation.revenue.revenue_per_attendee)
            .collect();
        Ok(ScoringInputs {
            event: entry.event.clone(),
            feedback: entry.feedback.clone(),
            prior_rpa,
        })
    }

    /// Write or overwrite the cached score. Fails if the event vanished meanwhile.
    pub fn store_score(&self, record: ScoreRecord) -> EngineResult<()> {
        let mut g = self.lock();
        let id = record.event_id();
        let entry = g.events.get_mut(&id).ok_or_else(|| event_not_found(id))?;
        entry.score = Some(record);
        Ok(())
    }

    pub fn score(&self, id: EventId) -> EngineResult<ScoreRecord> {
        let g = self.lock();
        let entry = g.events.get(&id).ok_or_else(|| event_not_found(id))?;
        entry
            .score
            .clone()
            .ok_or_else(|| EngineError::NotFound(format!("score for event {id} not computed yet")))
    }

    pub fn scored_events(&self) -> Vec<(Event, ScoreRecord)> {
        self.lock()
            .events
            .values()
            .filter_map(|e| e.score.clone().map(|s| (e.event.clone(), s)))
            .collect()
    }
}

fn event_not_found(id: EventId) -> EngineError {
    EngineError::NotFound(format!("event {id} not found"))
}

fn generate_slots() -> Vec<RespondentSlot> {
    let mut rng = rand::rng();
    let mut seen: HashSet<String> = HashSet::with_capacity(SLOTS_PER_EVENT);
    let mut slots = Vec::with_capacity(SLOTS_PER_EVENT);
    while slots.len() < SLOTS_PER_EVENT {
        let suffix: String = (0..SLOT_ID_LEN)
            .map(|_| SLOT_ID_CHARSET[rng.random_range(0..SLOT_ID_CHARSET.len())] as char)
            .collect();
        let id = format!("R-{suffix}");
        if seen.insert(id.clone()) {
            slots.push(RespondentSlot {
                id,
                filled_at: None,
            });
        }
    }
    slots
}
