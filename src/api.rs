use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::calibration::CalibrationReport;
use crate::composer::ScoreRecord;
use crate::config::EngineConfig;
use crate::demo::{seed_demo, DemoSeed};
use crate::engine::{FeedbackSubmission, LabelSubmission, NewEvent, ValueEngine};
use crate::error::{EngineError, EngineResult};
use crate::history::{HistoryEntry, HistorySort};
use crate::registry::ModelStatus;
use crate::store::{EventSummary, SlotListing, SubmissionReceipt};
use crate::types::{EventId, FeedbackItem};

// Shared app state used by Axum.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ValueEngine>,
}

impl AppState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            engine: Arc::new(ValueEngine::new(config)),
        }
    }

    /// Config from `$VALUE_ENGINE_CONFIG_PATH` / `config/engine.toml` + env overrides.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(&EngineConfig::from_env()?))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/{id}", get(get_event).delete(delete_event))
        .route("/api/events/{id}/respondents", get(list_respondents))
        .route(
            "/api/events/{id}/feedbacks",
            get(list_feedbacks).post(submit_feedback),
        )
        .route("/api/events/{id}/compute-score", post(compute_score))
        .route("/api/events/{id}/score", get(get_score))
        .route("/api/events/{id}/calibrate", post(calibrate))
        .route("/api/history", get(history))
        .route("/api/model-status", get(model_status))
        .route("/api/seed-demo", post(demo))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Malformed bodies (wrong types, missing fields, fractional counts) are
/// validation errors with the usual JSON error body.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> EngineResult<T> {
    body.map(|Json(v)| v)
        .map_err(|rejection| EngineError::Validation(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> EngineResult<T> {
    query
        .map(|Query(v)| v)
        .map_err(|rejection| EngineError::Validation(rejection.body_text()))
}

async fn list_events(State(state): State<AppState>) -> Json<Vec<EventSummary>> {
    Json(state.engine.list_events())
}

async fn create_event(
    State(state): State<AppState>,
    body: Result<Json<NewEvent>, JsonRejection>,
) -> EngineResult<(StatusCode, Json<EventSummary>)> {
    let ev = state.engine.create_event(json_body(body)?)?;
    Ok((StatusCode::CREATED, Json(ev)))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> EngineResult<Json<EventSummary>> {
    Ok(Json(state.engine.get_event(id)?))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> EngineResult<Json<Value>> {
    state.engine.delete_event(id)?;
    Ok(Json(json!({ "message": "Event deleted" })))
}

async fn list_respondents(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> EngineResult<Json<SlotListing>> {
    Ok(Json(state.engine.list_slots(id)?))
}

async fn list_feedbacks(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> EngineResult<Json<Vec<FeedbackItem>>> {
    Ok(Json(state.engine.list_feedback(id)?))
}

#[derive(Deserialize)]
struct RespondentQuery {
    respondent_id: String,
}

async fn submit_feedback(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    query: Result<Query<RespondentQuery>, QueryRejection>,
    body: Result<Json<FeedbackSubmission>, JsonRejection>,
) -> EngineResult<Json<SubmissionReceipt>> {
    let q = query_params(query)?;
    let body = json_body(body)?;
    Ok(Json(state.engine.submit_feedback(id, &q.respondent_id, body)?))
}

#[derive(Serialize)]
struct ScoreResponse {
    event_name: String,
    #[serde(flatten)]
    record: ScoreRecord,
}

async fn compute_score(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> EngineResult<Json<ScoreResponse>> {
    let record = state.engine.compute_score(id)?;
    let event_name = state.engine.get_event(id)?.name;
    Ok(Json(ScoreResponse { event_name, record }))
}

async fn get_score(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> EngineResult<Json<ScoreResponse>> {
    let event_name = state.engine.get_event(id)?.name;
    let record = state.engine.cached_score(id)?;
    Ok(Json(ScoreResponse { event_name, record }))
}

async fn calibrate(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    body: Result<Json<LabelSubmission>, JsonRejection>,
) -> EngineResult<Json<CalibrationReport>> {
    Ok(Json(state.engine.submit_label(id, json_body(body)?)?))
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    sort: HistorySort,
}

async fn history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> EngineResult<Json<Vec<HistoryEntry>>> {
    let q = query_params(query)?;
    Ok(Json(state.engine.history(q.sort)))
}

async fn model_status(State(state): State<AppState>) -> Json<ModelStatus> {
    Json(state.engine.model_status())
}

async fn demo(State(state): State<AppState>) -> EngineResult<Json<DemoSeed>> {
    Ok(Json(seed_demo(&state.engine)?))
}
