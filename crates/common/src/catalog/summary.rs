//! Proposal summaries as shown in listings

use super::{ProposalRecord, SupervisorRecord};
use serde::Serialize;

/// Shown when a proposal has no description
pub const NO_DESCRIPTION: &str = "No description provided";

/// Shown when a supervisor has no faculty
pub const UNSPECIFIED_DEPARTMENT: &str = "Not specified";

/// Field used when a proposal has neither tags nor a thesis type
pub const UNKNOWN_FIELD: &str = "Unknown";

/// Supervisor as displayed next to a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorInfo {
    pub name: String,
    pub department: String,
}

impl SupervisorInfo {
    pub fn from_parts(
        first_name: Option<&str>,
        last_name: Option<&str>,
        department: Option<&str>,
    ) -> Self {
        let name = format!("{} {}", first_name.unwrap_or(""), last_name.unwrap_or(""))
            .trim()
            .to_string();

        let department = department
            .filter(|d| !d.is_empty())
            .unwrap_or(UNSPECIFIED_DEPARTMENT)
            .to_string();

        Self { name, department }
    }

    pub fn from_record(record: Option<&SupervisorRecord>) -> Self {
        match record {
            Some(s) => Self::from_parts(
                s.first_name.as_deref(),
                s.last_name.as_deref(),
                s.department.as_deref(),
            ),
            None => Self::from_parts(None, None, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThesisProposalSummary {
    pub id: String,
    pub title: String,
    pub field: String,
    pub description: String,
    #[serde(rename = "professor")]
    pub supervisor: SupervisorInfo,
    pub tags: Vec<String>,
}

impl From<&ProposalRecord> for ThesisProposalSummary {
    fn from(record: &ProposalRecord) -> Self {
        let field = record
            .tags
            .first()
            .filter(|f| !f.is_empty())
            .or(record.thesis_type.as_ref().filter(|t| !t.is_empty()))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_FIELD.to_string());

        let description = record
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(NO_DESCRIPTION)
            .to_string();

        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            field,
            description,
            supervisor: SupervisorInfo::from_record(record.supervisor.as_ref()),
            tags: record.tags.clone(),
        }
    }
}
