//! Bookkeeping records shared between the store, the engine and the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type EventId = u64;

/// Respondent slots generated per event; never grows.
pub const SLOTS_PER_EVENT: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub attendance: u32,
    pub revenue: f64,
    pub created_at: DateTime<Utc>,
}

/// One anonymous feedback opportunity. `filled_at` is set exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespondentSlot {
    pub id: String,
    pub filled_at: Option<DateTime<Utc>>,
}

impl RespondentSlot {
    pub fn is_filled(&self) -> bool {
        self.filled_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub event_id: EventId,
    pub respondent_id: String,
    pub text: String,
    pub rating: Option<u8>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationLabel {
    pub event_id: EventId,
    pub admin_label: f64,
    pub labeled_at: DateTime<Utc>,
}
