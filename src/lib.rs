// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// Scoring pipeline (taxonomy, sentiment, feedback, revenue, composer)
pub mod composer;
pub mod feedback;
pub mod revenue;
pub mod sentiment;
pub mod taxonomy;
pub mod text;

// Calibration (regression, registry, calibration engine)
pub mod calibration;
pub mod model;
pub mod registry;
pub mod regression;

// Bookkeeping + facade
pub mod demo;
pub mod engine;
pub mod history;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::engine::ValueEngine;
pub use crate::error::{EngineError, EngineResult};

/// Build the full in-process Router (config from env), as the binary does
/// minus the metrics recorder.
pub async fn app() -> anyhow::Result<axum::Router> {
    let state = AppState::from_env()?;
    Ok(router(state))
}
