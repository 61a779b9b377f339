//! Field (tag) handlers

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Response,
};
use serde::Deserialize;
use thesisboard_common::catalog::{FieldListParams, FieldsResponse};

use super::{envelope, rejection};
use crate::AppState;

/// `GET /fields`
pub async fn list_fields(
    State(state): State<AppState>,
    query: Result<Query<FieldListParams>, QueryRejection>,
) -> Response {
    let response = match query {
        Ok(Query(params)) => state.catalog.list_fields(params).await,
        Err(e) => FieldsResponse::invalid(rejection("query", e.body_text())),
    };
    envelope(response.outcome, response)
}

#[derive(Debug, Default, Deserialize)]
pub struct FieldNamesQuery {
    /// Comma-separated field ids
    #[serde(default)]
    pub ids: Option<String>,
}

impl FieldNamesQuery {
    fn ids(&self) -> Vec<String> {
        self.ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// `GET /fields/names?ids=a,b`
pub async fn field_names(
    State(state): State<AppState>,
    Query(query): Query<FieldNamesQuery>,
) -> Response {
    let response = state.catalog.field_names(&query.ids()).await;
    envelope(response.outcome, response)
}
