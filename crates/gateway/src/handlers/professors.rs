//! Professor listing handler

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Response,
};
use thesisboard_common::catalog::{ProfessorListParams, ProfessorsResponse};

use super::{envelope, rejection};
use crate::AppState;

/// `GET /professors`
pub async fn list_professors(
    State(state): State<AppState>,
    query: Result<Query<ProfessorListParams>, QueryRejection>,
) -> Response {
    let response = match query {
        Ok(Query(params)) => state.catalog.list_professors(params).await,
        Err(e) => ProfessorsResponse::invalid(rejection("query", e.body_text())),
    };
    envelope(response.outcome, response)
}
