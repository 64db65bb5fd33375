//! Demo data: one fully answered event so the UI has something to score.

use serde::Serialize;
use tracing::info;

use crate::engine::{FeedbackSubmission, NewEvent, ValueEngine};
use crate::error::EngineResult;
use crate::types::EventId;

pub const DEMO_EVENT_NAME: &str = "Welcome Week Demo";
const DEMO_ATTENDANCE: i64 = 150;
const DEMO_REVENUE: f64 = 2250.0;

const DEMO_FEEDBACK: [(&str, u8); 30] = [
    ("The event was amazing! Loved the performances and the food was delicious.", 5),
    ("Great organization but the venue was a bit crowded. Still had fun!", 4),
    ("Wonderful atmosphere and welcoming community. Felt right at home.", 5),
    ("Good event overall. The program content was interesting and informative.", 4),
    ("The timing was perfect and everything ran smoothly. Impressed!", 5),
    ("Loved meeting new people. The networking opportunities were fantastic.", 5),
    ("Food options were great and the venue was accessible. Well done!", 4),
    ("The speakers were engaging and the activities were fun. Would attend again.", 5),
    ("Slightly rushed schedule but otherwise a memorable experience.", 4),
    ("Fantastic energy and inclusive vibes. Really knows how to throw an event!", 5),
    ("The registration was smooth and organized. Great first impression.", 4),
    ("Enjoyed the cultural showcase. Very informative about local traditions.", 5),
    ("Parking was a bit difficult but the event itself was worth it.", 4),
    ("Amazing community spirit. Everyone was so friendly and welcoming.", 5),
    ("The snacks were tasty and there were good halal options available.", 4),
    ("Duration was just right. Not too long, not too short.", 4),
    ("Loved the decorations and attention to detail. Very festive!", 5),
    ("Could use more seating but the standing areas had great views.", 4),
    ("The host was entertaining and kept the energy high throughout.", 5),
    ("Well-coordinated event. You could tell a lot of planning went into it.", 5),
    ("Good variety of activities for different interests.", 4),
    ("The venue location was convenient and easy to find.", 4),
    ("Felt very included as a first-time attendee. Made new friends!", 5),
    ("Professional yet fun atmosphere. Perfect balance.", 5),
    ("The event started on time which I really appreciated.", 4),
    ("Great content about the culture and the campus community.", 5),
    ("Would definitely recommend to other students.", 5),
    ("The organizers were helpful and answered all my questions.", 4),
    ("Memorable experience overall. Looking forward to future events!", 5),
    ("One of the best campus events I've attended. Well done!", 5),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoSeed {
    pub message: String,
    pub event_id: EventId,
    pub created: bool,
}

/// Create the demo event with 30 feedback items; no-op if it already exists.
pub fn seed_demo(engine: &ValueEngine) -> EngineResult<DemoSeed> {
    if let Some(existing) = engine.find_event_by_name(DEMO_EVENT_NAME) {
        return Ok(DemoSeed {
            message: "Demo already exists".to_string(),
            event_id: existing,
            created: false,
        });
    }

    let event = engine.create_event(NewEvent {
        name: DEMO_EVENT_NAME.to_string(),
        attendance: DEMO_ATTENDANCE,
        revenue: DEMO_REVENUE,
    })?;
    let slots = engine.list_slots(event.id)?;
    for (slot, (text, rating)) in slots.respondents.iter().zip(DEMO_FEEDBACK) {
        engine.submit_feedback(
            event.id,
            slot,
            FeedbackSubmission {
                text: text.to_string(),
                rating: Some(rating as i64),
            },
        )?;
    }
    info!(target: "events", event_id = event.id, "demo event seeded");

    Ok(DemoSeed {
        message: format!("Demo event created with {} feedbacks", DEMO_FEEDBACK.len()),
        event_id: event.id,
        created: true,
    })
}
