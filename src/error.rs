//! Error types for the value engine.
//!
//! Every user-facing failure carries a kind and a human-readable message.
//! Numeric failures inside model fitting live in [`crate::regression::FitError`]
//! and never reach this type: calibration degrades to "keep previous model".

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Input rejected before any state mutation (400).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown event, slot, or a score that was never computed (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Slot already filled or event already has all feedback (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Operation attempted before its inputs exist (422).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Should not happen; kept so handlers never panic (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable machine-readable kind used in JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::NotFound(_) => "not_found",
            EngineError::Conflict(_) => "conflict",
            EngineError::Precondition(_) => "precondition",
            EngineError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Precondition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            EngineError::Validation(m)
            | EngineError::NotFound(m)
            | EngineError::Conflict(m)
            | EngineError::Precondition(m)
            | EngineError::Internal(m) => m,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": self.message(),
            }
        }));
        (self.status(), body).into_response()
    }
}

/// Result type for engine operations and API handlers.
pub type EngineResult<T> = Result<T, EngineError>;
