//! history.rs — rows for the scored-events history view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::composer::ScoreRecord;
use crate::types::{Event, EventId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistorySort {
    /// Newest event first.
    #[default]
    Created,
    /// Highest value score first.
    Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: EventId,
    pub name: String,
    pub attendance: u32,
    pub revenue: f64,
    pub revenue_score: f64,
    pub feedback_score: f64,
    pub value_score: f64,
    pub model_version: u64,
    pub created_at: DateTime<Utc>,
    pub computed_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(event: &Event, score: &ScoreRecord) -> Self {
        Self {
            id: event.id,
            name: event.name.clone(),
            attendance: event.attendance,
            revenue: event.revenue,
            revenue_score: score.outcome.revenue_score,
            feedback_score: score.outcome.feedback_score,
            value_score: score.outcome.value_score,
            model_version: score.outcome.model_version,
            created_at: event.created_at,
            computed_at: score.computed_at,
        }
    }
}

/// Ties fall back to the higher event id (created later).
pub fn build_history(scored: &[(Event, ScoreRecord)], sort: HistorySort) -> Vec<HistoryEntry> {
    let mut rows: Vec<HistoryEntry> = scored.iter().map(|(e, s)| HistoryEntry::new(e, s)).collect();
    match sort {
        HistorySort::Created => {
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
        }
        HistorySort::Value => rows.sort_by(|a, b| {
            b.value_score
                .total_cmp(&a.value_score)
                .then(b.id.cmp(&a.id))
        }),
    }
    rows
}
