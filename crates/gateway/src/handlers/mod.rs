//! API handlers module

pub mod fields;
pub mod health;
pub mod metrics;
pub mod professors;
pub mod topics;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thesisboard_common::{catalog::Outcome, errors::FieldViolation};

/// HTTP status for a settled listing
pub fn status_for(outcome: Outcome) -> StatusCode {
    match outcome {
        Outcome::Ok => StatusCode::OK,
        Outcome::Invalid => StatusCode::BAD_REQUEST,
        Outcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Serialize an envelope with the status its outcome implies
pub fn envelope<T: Serialize>(outcome: Outcome, body: T) -> axum::response::Response {
    (status_for(outcome), Json(body)).into_response()
}

/// A rejected query string or body as a single violation
pub fn rejection(source: &str, text: String) -> Vec<FieldViolation> {
    tracing::warn!(source, reason = %text, "Malformed request");
    vec![FieldViolation::new(source, "malformed", text)]
}
