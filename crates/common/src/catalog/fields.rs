//! Fields (subject tags): listing, lookup, and field-filtered topics

use super::{
    non_blank, ListingOrder, Outcome, PageRequest, Pagination, ProposalFilter, ProposalRecord,
    ProposalStore, TagStore, ThesisProposalSummary,
};
use crate::errors::{AppError, FieldViolation};
use crate::metrics;
use chrono::NaiveDate;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{error, info, warn};
use validator::Validate;

/// Default fields per page
pub const DEFAULT_FIELDS_PER_PAGE: i64 = 10;

/// Default topics per page when filtering by field
pub const DEFAULT_FILTERED_PER_PAGE: i64 = 15;

const MAX_FIELDS_PER_PAGE: u64 = 100;
const MAX_FILTERED_PER_PAGE: u64 = 50;

/// URL-safe slug: lowercase, every whitespace run becomes one hyphen
pub fn slugify(name: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace =
        WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
    whitespace.replace_all(&name.to_lowercase(), "-").into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl Field {
    pub fn from_tag(tag: String) -> Self {
        Self {
            id: tag.clone(),
            slug: slugify(&tag),
            name: tag,
        }
    }
}

/// Query parameters of the field listing
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FieldListParams {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: i64,

    #[serde(default = "default_fields_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,

    #[serde(default, alias = "searchQuery")]
    pub search: Option<String>,
}

fn default_page() -> i64 { 1 }
fn default_fields_limit() -> i64 { DEFAULT_FIELDS_PER_PAGE }
fn default_filtered_limit() -> i64 { DEFAULT_FILTERED_PER_PAGE }

impl Default for FieldListParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_fields_limit(),
            search: None,
        }
    }
}

/// Field listing envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsResponse {
    pub success: bool,
    pub fields: Vec<Field>,
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
    #[serde(skip)]
    pub outcome: Outcome,
}

impl FieldsResponse {
    pub fn invalid(violations: Vec<FieldViolation>) -> Self {
        Self {
            success: false,
            fields: Vec::new(),
            pagination: Pagination::empty(1, DEFAULT_FIELDS_PER_PAGE as u64),
            message: Some("Invalid input parameters".to_string()),
            details: Some(violations),
            outcome: Outcome::Invalid,
        }
    }
}

pub(super) async fn list_fields(store: &dyn TagStore, params: FieldListParams) -> FieldsResponse {
    let start = Instant::now();

    let response = match load_fields(store, &params).await {
        Ok((fields, pagination)) => FieldsResponse {
            success: true,
            fields,
            pagination,
            message: None,
            details: None,
            outcome: Outcome::Ok,
        },
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "Rejected field listing parameters");
            FieldsResponse::invalid(e.violations())
        }
        Err(e) => {
            error!(error = %e, "Error fetching fields from tags");
            FieldsResponse {
                success: false,
                fields: Vec::new(),
                pagination: Pagination::empty(params.page as u64, params.limit as u64),
                message: Some("Failed to fetch fields".to_string()),
                details: None,
                outcome: Outcome::Failed,
            }
        }
    };

    metrics::record_listing(
        "fields",
        response.outcome.as_str(),
        start.elapsed().as_secs_f64(),
        response.fields.len(),
    );
    response
}

async fn load_fields(
    store: &dyn TagStore,
    params: &FieldListParams,
) -> crate::errors::Result<(Vec<Field>, Pagination)> {
    params.validate()?;
    let request = PageRequest::new(params.page, params.limit, MAX_FIELDS_PER_PAGE, "limit")?;
    let search = non_blank(params.search.as_deref());

    let (total_count, tags) = futures::try_join!(
        store.count_tags(search.as_deref()),
        store.tag_page(search.as_deref(), request.offset(), request.per_page())
    )?;

    let fields = tags.into_iter().map(Field::from_tag).collect();
    Ok((fields, Pagination::for_request(request, total_count)))
}

/// Known field names among requested ids
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNamesResponse {
    pub success: bool,
    pub field_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub outcome: Outcome,
}

pub(super) async fn field_names(store: &dyn TagStore, ids: &[String]) -> FieldNamesResponse {
    let ids: Vec<String> = ids.iter().filter_map(|id| non_blank(Some(id))).collect();
    if ids.is_empty() {
        return FieldNamesResponse {
            success: true,
            field_names: Vec::new(),
            error: None,
            outcome: Outcome::Ok,
        };
    }

    match store.existing_tags(&ids).await {
        Ok(field_names) => FieldNamesResponse {
            success: true,
            field_names,
            error: None,
            outcome: Outcome::Ok,
        },
        Err(e) => {
            error!(error = %e, "Error getting field names");
            FieldNamesResponse {
                success: false,
                field_names: Vec::new(),
                error: Some("Failed to get field names".to_string()),
                outcome: Outcome::Failed,
            }
        }
    }
}

/// Topics on the page, their pagination, and the field ids actually applied
type FilteredPage = (Vec<FilteredTopic>, Pagination, Vec<String>);

/// Body of a field-filtered topic listing
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilterParams {
    #[serde(default)]
    #[validate(length(min = 1, message = "At least one field must be selected"))]
    pub selected_field_ids: Vec<String>,

    #[serde(default)]
    pub search_query: Option<String>,

    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: i64,

    #[serde(default = "default_filtered_limit")]
    #[validate(range(min = 1, max = 50))]
    pub items_per_page: i64,
}

impl FieldFilterParams {
    pub fn new(selected_field_ids: Vec<String>) -> Self {
        Self {
            selected_field_ids,
            search_query: None,
            page: default_page(),
            items_per_page: default_filtered_limit(),
        }
    }
}

/// A topic in a field-filtered listing: the summary plus scheduling details
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredTopic {
    #[serde(flatten)]
    pub summary: ThesisProposalSummary,
    pub thesis_type: Option<String>,
    pub application_start: Option<NaiveDate>,
    pub application_end: Option<NaiveDate>,
    pub requirements: Option<String>,
}

impl From<ProposalRecord> for FilteredTopic {
    fn from(record: ProposalRecord) -> Self {
        Self {
            summary: ThesisProposalSummary::from(&record),
            thesis_type: record.thesis_type,
            application_start: record.application_start,
            application_end: record.application_end,
            requirements: record.requirements,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
    pub search_query: Option<String>,
    pub field_count: usize,
}

/// Field-filtered topic listing envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredTopicsResponse {
    pub success: bool,
    pub topics: Vec<FilteredTopic>,
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_field_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_filters: Option<AppliedFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
    #[serde(skip)]
    pub outcome: Outcome,
}

impl FilteredTopicsResponse {
    pub fn invalid(violations: Vec<FieldViolation>) -> Self {
        Self::rejected("Invalid input parameters", Some(violations), Outcome::Invalid)
    }

    fn rejected(error: &str, details: Option<Vec<FieldViolation>>, outcome: Outcome) -> Self {
        Self {
            success: false,
            topics: Vec::new(),
            pagination: Pagination::empty(1, DEFAULT_FILTERED_PER_PAGE as u64),
            selected_field_ids: None,
            applied_filters: None,
            error: Some(error.to_string()),
            details,
            outcome,
        }
    }
}

pub(super) async fn filter_topics_by_fields(
    store: &dyn ProposalStore,
    params: FieldFilterParams,
) -> FilteredTopicsResponse {
    let start = Instant::now();

    let response = match load_filtered(store, &params).await {
        Ok((topics, pagination, selected)) => {
            info!(
                fields = selected.len(),
                total_count = pagination.total_count(),
                returned = topics.len(),
                "Topics filtered by field"
            );
            FilteredTopicsResponse {
                success: true,
                topics,
                pagination,
                applied_filters: Some(AppliedFilters {
                    search_query: non_blank(params.search_query.as_deref()),
                    field_count: selected.len(),
                }),
                selected_field_ids: Some(selected),
                error: None,
                details: None,
                outcome: Outcome::Ok,
            }
        }
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "Rejected field filter parameters");
            FilteredTopicsResponse::invalid(e.violations())
        }
        Err(e) => {
            error!(error = %e, "Error filtering selected fields");
            FilteredTopicsResponse::rejected(
                "Failed to filter topics by selected fields",
                None,
                Outcome::Failed,
            )
        }
    };

    metrics::record_listing(
        "topics_by_field",
        response.outcome.as_str(),
        start.elapsed().as_secs_f64(),
        response.topics.len(),
    );
    response
}

async fn load_filtered(
    store: &dyn ProposalStore,
    params: &FieldFilterParams,
) -> crate::errors::Result<FilteredPage> {
    params.validate()?;
    let request = PageRequest::new(params.page, params.items_per_page, MAX_FILTERED_PER_PAGE, "itemsPerPage")?;

    let selected: Vec<String> = params
        .selected_field_ids
        .iter()
        .filter_map(|id| non_blank(Some(id)))
        .collect();
    if selected.is_empty() {
        return Err(AppError::Validation {
            message: "At least one field must be selected".to_string(),
            field: Some("selectedFieldIds".to_string()),
        });
    }

    let filter = ProposalFilter::search(params.search_query.as_deref()).with_tags(selected.clone());

    let (total_count, records) = futures::try_join!(
        store.count(&filter),
        store.page(
            &filter,
            ListingOrder::ApplicationStartDesc,
            request.offset(),
            request.per_page(),
        )
    )?;

    let topics = records.into_iter().map(FilteredTopic::from).collect();
    Ok((topics, Pagination::for_request(request, total_count), selected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;

    fn tagged(id: &str, tags: &[&str], start: (i32, u32, u32)) -> ProposalRecord {
        ProposalRecord {
            id: id.into(),
            title: format!("Title {}", id),
            requirements: Some("Rust".into()),
            thesis_type: Some("Bachelor".into()),
            application_start: NaiveDate::from_ymd_opt(start.0, start.1, start.2),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_tags(["Machine Learning", "Robotics", "Databases", "Computer Vision"])
            .with_proposals(vec![
                tagged("p1", &["Robotics"], (2024, 9, 1)),
                tagged("p2", &["Databases"], (2025, 2, 1)),
                tagged("p3", &["Robotics", "Computer Vision"], (2025, 1, 15)),
                tagged("p4", &["Machine Learning"], (2023, 5, 1)),
            ])
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Machine  Learning"), "machine-learning");
        assert_eq!(slugify("Computer\tVision and\n AI"), "computer-vision-and-ai");
        assert_eq!(slugify("Databases"), "databases");
    }

    #[tokio::test]
    async fn test_list_fields_paginates_alphabetically() {
        let store = catalog();
        let params = FieldListParams {
            page: 2,
            limit: 3,
            search: None,
        };

        let response = list_fields(&store, params).await;

        assert!(response.success);
        assert_eq!(response.fields, vec![Field::from_tag("Robotics".into())]);
        assert_eq!(response.pagination.total_count(), 4);
        assert_eq!(response.pagination.total_pages(), 2);
        assert!(!response.pagination.has_next_page());
    }

    #[tokio::test]
    async fn test_list_fields_search_is_case_insensitive() {
        let store = catalog();
        let params = FieldListParams {
            search: Some(" VISION ".into()),
            ..Default::default()
        };

        let response = list_fields(&store, params).await;
        assert_eq!(response.fields.len(), 1);
        assert_eq!(response.fields[0].slug, "computer-vision");
    }

    #[tokio::test]
    async fn test_list_fields_failure() {
        let response = list_fields(&InMemoryCatalog::failing(), FieldListParams::default()).await;
        assert!(!response.success);
        assert_eq!(response.outcome, Outcome::Failed);
        assert_eq!(response.message.as_deref(), Some("Failed to fetch fields"));
        assert!(response.fields.is_empty());
    }

    #[tokio::test]
    async fn test_field_names_keeps_known_ids() {
        let store = catalog();
        let ids = vec!["Robotics".to_string(), "Alchemy".to_string(), "Databases".to_string()];

        let response = field_names(&store, &ids).await;
        assert!(response.success);
        assert_eq!(response.field_names, vec!["Databases", "Robotics"]);

        let failed = field_names(&InMemoryCatalog::failing(), &ids).await;
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("Failed to get field names"));
    }

    #[tokio::test]
    async fn test_filter_orders_by_application_start() {
        let store = catalog();
        let params = FieldFilterParams::new(vec!["Robotics".into(), "Databases".into()]);

        let response = filter_topics_by_fields(&store, params).await;

        assert!(response.success);
        let ids: Vec<&str> = response.topics.iter().map(|t| t.summary.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3", "p1"]);
        assert_eq!(response.pagination.total_count(), 3);
        assert_eq!(response.pagination.items_per_page(), 15);
        assert_eq!(response.applied_filters.unwrap().field_count, 2);
        assert_eq!(response.topics[1].summary.field, "Robotics");
        assert_eq!(response.topics[1].requirements.as_deref(), Some("Rust"));
    }

    #[tokio::test]
    async fn test_filter_with_search() {
        let store = catalog();
        let mut params = FieldFilterParams::new(vec!["Robotics".into()]);
        params.search_query = Some("vision".into());

        let response = filter_topics_by_fields(&store, params).await;
        assert_eq!(response.topics.len(), 1);
        assert_eq!(response.topics[0].summary.id, "p3");
        assert_eq!(
            response.applied_filters.unwrap().search_query.as_deref(),
            Some("vision")
        );
    }

    #[tokio::test]
    async fn test_filter_requires_a_field() {
        let response = filter_topics_by_fields(&catalog(), FieldFilterParams::new(vec![])).await;

        assert!(!response.success);
        assert_eq!(response.outcome, Outcome::Invalid);
        assert_eq!(response.error.as_deref(), Some("Invalid input parameters"));
        assert!(response.topics.is_empty());
        assert_eq!(response.pagination.total_count(), 0);
        assert_eq!(response.pagination.total_pages(), 0);
        assert_eq!(response.pagination.current_page(), 1);

        let details = response.details.unwrap();
        assert_eq!(details[0].field, "selectedFieldIds");
        assert_eq!(details[0].message, "At least one field must be selected");
    }

    #[tokio::test]
    async fn test_applied_filters_skip_blank_ids() {
        let params = FieldFilterParams::new(vec![
            "Robotics".into(),
            "  ".into(),
            String::new(),
            " Databases ".into(),
        ]);

        let response = filter_topics_by_fields(&catalog(), params).await;
        assert!(response.success);
        assert_eq!(response.applied_filters.unwrap().field_count, 2);
        assert_eq!(
            response.selected_field_ids.unwrap(),
            vec!["Robotics".to_string(), "Databases".to_string()]
        );
        assert_eq!(response.pagination.total_count(), 3);
    }

    #[tokio::test]
    async fn test_filter_page_size_is_bounded() {
        let mut params = FieldFilterParams::new(vec!["Robotics".into()]);
        params.items_per_page = 51;

        let response = filter_topics_by_fields(&catalog(), params).await;
        assert_eq!(response.outcome, Outcome::Invalid);
    }

    #[tokio::test]
    async fn test_filter_store_failure() {
        let response = filter_topics_by_fields(
            &InMemoryCatalog::failing(),
            FieldFilterParams::new(vec!["Robotics".into()]),
        )
        .await;

        assert!(!response.success);
        assert_eq!(response.outcome, Outcome::Failed);
        assert_eq!(
            response.error.as_deref(),
            Some("Failed to filter topics by selected fields")
        );
    }
}
