//! Topic listing handlers

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Query, State},
    response::Response,
    Json,
};
use thesisboard_common::catalog::{
    FieldFilterParams, FilteredTopicsResponse, TopicsParams, TopicsResponse,
};

use super::{envelope, rejection};
use crate::AppState;

/// `GET /topics`: paginated, optionally personalized topic listing
pub async fn list_topics(
    State(state): State<AppState>,
    query: Result<Query<TopicsParams>, QueryRejection>,
) -> Response {
    let response = match query {
        Ok(Query(params)) => state.catalog.list_topics(params).await,
        Err(e) => TopicsResponse::invalid(rejection("query", e.body_text())),
    };
    envelope(response.outcome, response)
}

/// `POST /topics/filter`: topics carrying any of the selected fields
pub async fn filter_topics(
    State(state): State<AppState>,
    body: Result<Json<FieldFilterParams>, JsonRejection>,
) -> Response {
    let response = match body {
        Ok(Json(params)) => state.catalog.filter_topics_by_fields(params).await,
        Err(e) => FilteredTopicsResponse::invalid(rejection("body", e.body_text())),
    };
    envelope(response.outcome, response)
}
