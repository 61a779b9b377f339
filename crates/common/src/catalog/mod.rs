//! Thesis catalog: store abstractions and the public listing routines
//!
//! Every routine here is a read. Storage is reached only through the
//! [`ProposalStore`], [`TagStore`] and [`SupervisorStore`] traits, so the
//! Postgres repository and the in-memory catalog are interchangeable.
//!
//! Public routines never return errors: validation and store failures are
//! folded into the response envelope (see [`Outcome`]).

mod fields;
mod memory;
mod pagination;
mod professors;
mod summary;
mod topics;

pub use fields::{
    slugify, AppliedFilters, Field, FieldFilterParams, FieldListParams, FieldNamesResponse,
    FieldsResponse, FilteredTopic, FilteredTopicsResponse,
};
pub use memory::InMemoryCatalog;
pub use pagination::{total_pages, PageRequest, Pagination};
pub use professors::{Professor, ProfessorListParams, ProfessorsResponse};
pub use summary::{
    SupervisorInfo, ThesisProposalSummary, NO_DESCRIPTION, UNKNOWN_FIELD, UNSPECIFIED_DEPARTMENT,
};
pub use topics::{merge_recommended, MergeSettings, TopicPage, TopicPageAssembler, TopicsParams, TopicsResponse};

use crate::errors::Result;
use crate::recommendations::RecommendationSource;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

/// How a listing settled; drives the HTTP status, never serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Ok,
    Invalid,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Invalid => "invalid",
            Outcome::Failed => "failed",
        }
    }
}

/// Row filter shared by every proposal listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalFilter {
    /// Case-insensitive substring, already trimmed and non-empty
    search: Option<String>,

    /// Proposal must carry at least one of these tag names (empty = any)
    tags: Vec<String>,
}

impl ProposalFilter {
    /// Filter on a free-text search; blank input means no predicate
    pub fn search(term: Option<&str>) -> Self {
        Self {
            search: non_blank(term),
            tags: Vec::new(),
        }
    }

    /// Restrict to proposals tagged with any of `tags`
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Evaluate the filter against an already-loaded record
    pub fn matches(&self, record: &ProposalRecord) -> bool {
        if !self.tags.is_empty() && !record.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }

        let Some(term) = self.search.as_deref() else {
            return true;
        };
        let term = term.to_lowercase();
        let hit = |value: Option<&str>| value.is_some_and(|v| v.to_lowercase().contains(&term));

        hit(Some(&record.title))
            || hit(record.description.as_deref())
            || hit(record.requirements.as_deref())
            || record.supervisor.as_ref().is_some_and(|s| {
                hit(s.first_name.as_deref()) || hit(s.last_name.as_deref())
            })
            || record.tags.iter().any(|t| hit(Some(t)))
    }
}

/// Trim caller text; blank input becomes `None`
pub fn non_blank(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Fixed ordering of a proposal listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOrder {
    /// Topic browsing: title ascending
    TitleAsc,
    /// Field filtering: most recent application start first
    ApplicationStartDesc,
}

/// The single supervisor joined to a proposal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorRecord {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
}

/// A proposal row after join normalization.
///
/// Joins yield at most one supervisor (with at most one faculty); tags are
/// kept in join order and may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub thesis_type: Option<String>,
    pub application_start: Option<NaiveDate>,
    pub application_end: Option<NaiveDate>,
    pub supervisor: Option<SupervisorRecord>,
    pub tags: Vec<String>,
}

/// A supervisor listed on its own
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorProfile {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
}

/// Read access to thesis proposals
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Number of proposals matching `filter`
    async fn count(&self, filter: &ProposalFilter) -> Result<u64>;

    /// One window of matching proposals in `order`
    async fn page(
        &self,
        filter: &ProposalFilter,
        order: ListingOrder,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ProposalRecord>>;

    /// Connectivity check for readiness probes
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Read access to subject tags
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn count_tags(&self, search: Option<&str>) -> Result<u64>;

    /// Tag names ordered alphabetically
    async fn tag_page(&self, search: Option<&str>, offset: u64, limit: u64) -> Result<Vec<String>>;

    /// The subset of `names` that exist, ordered alphabetically
    async fn existing_tags(&self, names: &[String]) -> Result<Vec<String>>;
}

/// Read access to supervisors
#[async_trait]
pub trait SupervisorStore: Send + Sync {
    async fn count_supervisors(&self, search: Option<&str>) -> Result<u64>;

    /// Supervisors ordered by surname
    async fn supervisor_page(
        &self,
        search: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SupervisorProfile>>;
}

/// Facade over every listing routine
#[derive(Clone)]
pub struct Catalog {
    topics: TopicPageAssembler,
    proposals: Arc<dyn ProposalStore>,
    tags: Arc<dyn TagStore>,
    supervisors: Arc<dyn SupervisorStore>,
}

impl Catalog {
    /// Build a catalog whose stores are all served by `store`
    pub fn new<S>(
        store: Arc<S>,
        recommendations: Arc<dyn RecommendationSource>,
        settings: MergeSettings,
    ) -> Self
    where
        S: ProposalStore + TagStore + SupervisorStore + 'static,
    {
        let proposals: Arc<dyn ProposalStore> = store.clone();
        Self {
            topics: TopicPageAssembler::new(proposals.clone(), recommendations, settings),
            proposals,
            tags: store.clone(),
            supervisors: store,
        }
    }

    pub fn topics(&self) -> &TopicPageAssembler {
        &self.topics
    }

    /// Paginated, optionally personalized topic listing
    pub async fn list_topics(&self, params: TopicsParams) -> TopicsResponse {
        self.topics.list_topics(params).await
    }

    /// Topics carrying any of the selected fields
    pub async fn filter_topics_by_fields(&self, params: FieldFilterParams) -> FilteredTopicsResponse {
        fields::filter_topics_by_fields(self.proposals.as_ref(), params).await
    }

    /// Paginated field (tag) listing
    pub async fn list_fields(&self, params: FieldListParams) -> FieldsResponse {
        fields::list_fields(self.tags.as_ref(), params).await
    }

    /// Resolve which of `ids` are known fields
    pub async fn field_names(&self, ids: &[String]) -> FieldNamesResponse {
        fields::field_names(self.tags.as_ref(), ids).await
    }

    /// Paginated professor listing
    pub async fn list_professors(&self, params: ProfessorListParams) -> ProfessorsResponse {
        professors::list_professors(self.supervisors.as_ref(), params).await
    }

    /// Store connectivity for readiness probes
    pub async fn ping(&self) -> Result<()> {
        self.proposals.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProposalRecord {
        ProposalRecord {
            id: "t-1".into(),
            title: "Graph Neural Networks".into(),
            description: Some("Learning on molecules".into()),
            requirements: Some("Python".into()),
            supervisor: Some(SupervisorRecord {
                first_name: Some("Ada".into()),
                last_name: Some("Lovelace".into()),
                department: Some("Informatics".into()),
            }),
            tags: vec!["Machine Learning".into(), "Chemistry".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_blank_search_is_no_predicate() {
        assert_eq!(ProposalFilter::search(Some("   ")).search_term(), None);
        assert_eq!(ProposalFilter::search(Some("  graph ")).search_term(), Some("graph"));
        assert!(ProposalFilter::search(None).matches(&record()));
    }

    #[test]
    fn test_search_covers_every_text_column() {
        let r = record();
        for term in ["GRAPH", "molecules", "python", "lovelace", "ada", "chemistry"] {
            assert!(ProposalFilter::search(Some(term)).matches(&r), "{term}");
        }
        assert!(!ProposalFilter::search(Some("informatics")).matches(&r));
    }

    #[test]
    fn test_catalog_ping_follows_store() {
        use crate::recommendations::DisabledRecommendations;

        let catalog = |store: InMemoryCatalog| {
            Catalog::new(Arc::new(store), Arc::new(DisabledRecommendations), MergeSettings::default())
        };
        assert!(tokio_test::block_on(catalog(InMemoryCatalog::new()).ping()).is_ok());
        assert!(tokio_test::block_on(catalog(InMemoryCatalog::failing()).ping()).is_err());
    }

    #[test]
    fn test_tag_filter_matches_any() {
        let r = record();
        let hit = ProposalFilter::search(None).with_tags(vec!["Chemistry".into(), "Art".into()]);
        let miss = ProposalFilter::search(None).with_tags(vec!["Art".into()]);
        assert!(hit.matches(&r));
        assert!(!miss.matches(&r));
    }
}
