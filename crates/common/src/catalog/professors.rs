//! Professor (supervisor) listing

use super::{non_blank, Outcome, PageRequest, Pagination, SupervisorInfo, SupervisorProfile, SupervisorStore};
use crate::errors::{FieldViolation, Result};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, warn};
use validator::Validate;

/// Default professors per page
pub const DEFAULT_PROFESSORS_PER_PAGE: i64 = 10;

const MAX_PROFESSORS_PER_PAGE: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Professor {
    pub id: String,
    pub name: String,
    pub department: String,
}

impl From<SupervisorProfile> for Professor {
    fn from(profile: SupervisorProfile) -> Self {
        let info = SupervisorInfo::from_parts(
            profile.first_name.as_deref(),
            profile.last_name.as_deref(),
            profile.department.as_deref(),
        );
        Self {
            id: profile.id,
            name: info.name,
            department: info.department,
        }
    }
}

/// Query parameters of the professor listing
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfessorListParams {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: i64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,

    #[serde(default, alias = "searchQuery")]
    pub search: Option<String>,
}

fn default_page() -> i64 { 1 }
fn default_limit() -> i64 { DEFAULT_PROFESSORS_PER_PAGE }

impl Default for ProfessorListParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            search: None,
        }
    }
}

/// Professor listing envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessorsResponse {
    pub success: bool,
    pub professors: Vec<Professor>,
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
    #[serde(skip)]
    pub outcome: Outcome,
}

impl ProfessorsResponse {
    pub fn invalid(violations: Vec<FieldViolation>) -> Self {
        Self {
            success: false,
            professors: Vec::new(),
            pagination: Pagination::empty(1, DEFAULT_PROFESSORS_PER_PAGE as u64),
            message: Some("Invalid input parameters".to_string()),
            details: Some(violations),
            outcome: Outcome::Invalid,
        }
    }
}

pub(super) async fn list_professors(
    store: &dyn SupervisorStore,
    params: ProfessorListParams,
) -> ProfessorsResponse {
    let start = Instant::now();

    let response = match load(store, &params).await {
        Ok((professors, pagination)) => ProfessorsResponse {
            success: true,
            professors,
            pagination,
            message: None,
            details: None,
            outcome: Outcome::Ok,
        },
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "Rejected professor listing parameters");
            ProfessorsResponse::invalid(e.violations())
        }
        Err(e) => {
            error!(error = %e, "Error fetching professors");
            ProfessorsResponse {
                success: false,
                professors: Vec::new(),
                pagination: Pagination::empty(params.page as u64, params.limit as u64),
                message: Some("Failed to fetch professors".to_string()),
                details: None,
                outcome: Outcome::Failed,
            }
        }
    };

    metrics::record_listing(
        "professors",
        response.outcome.as_str(),
        start.elapsed().as_secs_f64(),
        response.professors.len(),
    );
    response
}

async fn load(
    store: &dyn SupervisorStore,
    params: &ProfessorListParams,
) -> Result<(Vec<Professor>, Pagination)> {
    params.validate()?;
    let request = PageRequest::new(params.page, params.limit, MAX_PROFESSORS_PER_PAGE, "limit")?;
    let search = non_blank(params.search.as_deref());

    let (total_count, profiles) = futures::try_join!(
        store.count_supervisors(search.as_deref()),
        store.supervisor_page(search.as_deref(), request.offset(), request.per_page())
    )?;

    let professors = profiles.into_iter().map(Professor::from).collect();
    Ok((professors, Pagination::for_request(request, total_count)))
}
