//! Topic listing with recommendation merge
//!
//! A topic page is a title-ordered window over the search-filtered
//! proposals. On the first page, when a student is known, the page is
//! re-ranked: proposals recommended for that student come first (in the
//! source's order), followed by the remaining plain items, truncated to the
//! page size. The recommendation step is best effort; any failure in it
//! returns the plain page unchanged.

use super::{
    non_blank, ListingOrder, Outcome, PageRequest, Pagination, ProposalFilter,
    ProposalRecord, ProposalStore, ThesisProposalSummary,
};
use crate::config::RecommendationConfig;
use crate::errors::{AppError, FieldViolation, Result};
use crate::metrics;
use crate::recommendations::RecommendationSource;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use validator::Validate;

/// Default topics per page
pub const DEFAULT_TOPICS_PER_PAGE: i64 = 10;

/// Largest accepted topic page
pub const MAX_TOPICS_PER_PAGE: u64 = 100;

/// Tuning of the recommendation step
#[derive(Debug, Clone, Copy)]
pub struct MergeSettings {
    /// Cap on the lookup table loaded for a merge
    pub universe_limit: u64,
    /// Time box of one recommendation fetch
    pub timeout: Duration,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self::from_config(&RecommendationConfig::default())
    }
}

impl MergeSettings {
    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self {
            universe_limit: config.universe_limit,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Query parameters of the topic listing
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TopicsParams {
    #[serde(default, alias = "searchQuery")]
    pub search: Option<String>,

    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: i64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,

    #[serde(default)]
    pub student_id: Option<String>,
}

fn default_page() -> i64 { 1 }
fn default_limit() -> i64 { DEFAULT_TOPICS_PER_PAGE }

impl Default for TopicsParams {
    fn default() -> Self {
        Self {
            search: None,
            page: default_page(),
            limit: default_limit(),
            student_id: None,
        }
    }
}

/// A resolved topic page
#[derive(Debug, Clone, PartialEq)]
pub struct TopicPage {
    pub topics: Vec<ThesisProposalSummary>,
    pub pagination: Pagination,
    /// Number of leading topics that came from recommendations
    pub recommended: usize,
}

/// Topic listing envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicsResponse {
    pub success: bool,
    pub topics: Vec<ThesisProposalSummary>,
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
    #[serde(skip)]
    pub outcome: Outcome,
}

impl TopicsResponse {
    fn success(page: TopicPage) -> Self {
        Self {
            success: true,
            topics: page.topics,
            pagination: page.pagination,
            message: None,
            details: None,
            outcome: Outcome::Ok,
        }
    }

    /// Validation envelope: zeroed pagination, default page size
    pub fn invalid(violations: Vec<FieldViolation>) -> Self {
        Self {
            success: false,
            topics: Vec::new(),
            pagination: Pagination::empty(1, DEFAULT_TOPICS_PER_PAGE as u64),
            message: Some("Invalid input parameters".to_string()),
            details: Some(violations),
            outcome: Outcome::Invalid,
        }
    }

    fn failure(page: u64, per_page: u64) -> Self {
        Self {
            success: false,
            topics: Vec::new(),
            pagination: Pagination::empty(page, per_page),
            message: Some("Failed to fetch topics".to_string()),
            details: None,
            outcome: Outcome::Failed,
        }
    }
}

/// Put `recommended` ahead of `plain`, dropping plain items already
/// recommended and repeated recommendations, and cut to `limit` items.
pub fn merge_recommended(
    recommended: Vec<ThesisProposalSummary>,
    plain: Vec<ThesisProposalSummary>,
    limit: usize,
) -> Vec<ThesisProposalSummary> {
    let mut seen: HashSet<String> = HashSet::with_capacity(recommended.len());
    let mut merged = Vec::with_capacity(limit);

    for topic in recommended {
        if merged.len() >= limit {
            break;
        }
        if seen.insert(topic.id.clone()) {
            merged.push(topic);
        }
    }

    for topic in plain {
        if merged.len() >= limit {
            break;
        }
        if !seen.contains(&topic.id) {
            merged.push(topic);
        }
    }

    merged
}

/// Resolves topic pages from a proposal store and a recommendation source
#[derive(Clone)]
pub struct TopicPageAssembler {
    proposals: Arc<dyn ProposalStore>,
    recommendations: Arc<dyn RecommendationSource>,
    settings: MergeSettings,
}

impl TopicPageAssembler {
    pub fn new(
        proposals: Arc<dyn ProposalStore>,
        recommendations: Arc<dyn RecommendationSource>,
        settings: MergeSettings,
    ) -> Self {
        Self {
            proposals,
            recommendations,
            settings,
        }
    }

    /// Resolve one page. Fails on invalid paging or a store error; never
    /// fails because of the recommendation source.
    pub async fn assemble(
        &self,
        search: Option<&str>,
        page: i64,
        per_page: i64,
        student_id: Option<&str>,
    ) -> Result<TopicPage> {
        let request = PageRequest::new(page, per_page, MAX_TOPICS_PER_PAGE, "limit")?;
        let filter = ProposalFilter::search(search);

        let (total_count, records) = futures::try_join!(
            self.proposals.count(&filter),
            self.proposals.page(
                &filter,
                ListingOrder::TitleAsc,
                request.offset(),
                request.per_page(),
            )
        )?;

        let plain: Vec<ThesisProposalSummary> =
            records.iter().map(ThesisProposalSummary::from).collect();
        let pagination = Pagination::for_request(request, total_count);

        let student = non_blank(student_id);
        let (topics, recommended) = match student {
            Some(student) if request.is_first() => {
                self.personalize(&filter, &student, plain, request.per_page() as usize)
                    .await
            }
            _ => (plain, 0),
        };

        Ok(TopicPage {
            topics,
            pagination,
            recommended,
        })
    }

    /// Re-rank the first page for `student_id`, falling back to `plain`
    async fn personalize(
        &self,
        filter: &ProposalFilter,
        student_id: &str,
        plain: Vec<ThesisProposalSummary>,
        limit: usize,
    ) -> (Vec<ThesisProposalSummary>, usize) {
        let source = self.recommendations.name().to_string();

        let universe = self.proposals.page(
            filter,
            ListingOrder::TitleAsc,
            0,
            self.settings.universe_limit,
        );
        let recommendations = tokio::time::timeout(
            self.settings.timeout,
            self.recommendations.recommend(student_id),
        );
        let (universe, recommendations) = futures::join!(universe, recommendations);

        let universe = match universe {
            Ok(universe) => universe,
            Err(e) => {
                warn!(error = %e, student_id, "Failed to load proposals for recommendations");
                metrics::record_recommendation(&source, "universe_error", 0);
                return (plain, 0);
            }
        };

        let items = match recommendations {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                warn!(error = %e, source = %source, student_id, "Failed to fetch recommendations");
                metrics::record_recommendation(&source, "error", 0);
                return (plain, 0);
            }
            Err(_) => {
                let err = AppError::RecommendationTimeout {
                    timeout_ms: self.settings.timeout.as_millis() as u64,
                };
                warn!(error = %err, source = %source, student_id, "Failed to fetch recommendations");
                metrics::record_recommendation(&source, "timeout", 0);
                return (plain, 0);
            }
        };

        if universe.len() as u64 >= self.settings.universe_limit {
            debug!(
                limit = self.settings.universe_limit,
                "Recommendation lookup table truncated"
            );
        }

        let by_id: HashMap<&str, &ProposalRecord> =
            universe.iter().map(|r| (r.id.as_str(), r)).collect();

        let recommended: Vec<ThesisProposalSummary> = items
            .iter()
            .filter_map(|item| by_id.get(item.id.as_str()))
            .map(|record| ThesisProposalSummary::from(*record))
            .collect();

        let promoted = recommended
            .iter()
            .map(|t| t.id.as_str())
            .collect::<HashSet<_>>()
            .len()
            .min(limit);
        let merged = merge_recommended(recommended, plain, limit);

        metrics::record_recommendation(&source, "merged", promoted);
        debug!(
            student_id,
            returned = items.len(),
            promoted,
            "Recommendations merged"
        );

        (merged, promoted)
    }

    /// Topic listing envelope; validation and store failures are folded in
    pub async fn list_topics(&self, params: TopicsParams) -> TopicsResponse {
        let start = Instant::now();

        let response = match params.validate() {
            Err(errors) => {
                let err = AppError::from(errors);
                warn!(error = %err, "Rejected topic listing parameters");
                TopicsResponse::invalid(err.violations())
            }
            Ok(()) => {
                let result = self
                    .assemble(
                        params.search.as_deref(),
                        params.page,
                        params.limit,
                        params.student_id.as_deref(),
                    )
                    .await;

                match result {
                    Ok(page) => {
                        info!(
                            search = params.search.as_deref().unwrap_or(""),
                            page = params.page,
                            total_count = page.pagination.total_count(),
                            returned = page.topics.len(),
                            recommended = page.recommended,
                            "Topics listed"
                        );
                        TopicsResponse::success(page)
                    }
                    Err(e) if e.is_client_error() => TopicsResponse::invalid(e.violations()),
                    Err(e) => {
                        error!(error = %e, page = params.page, "Error fetching topics");
                        TopicsResponse::failure(params.page as u64, params.limit as u64)
                    }
                }
            }
        };

        metrics::record_listing(
            "topics",
            response.outcome.as_str(),
            start.elapsed().as_secs_f64(),
            response.topics.len(),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, SupervisorRecord};
    use crate::recommendations::{RecommendationItem, StaticRecommendations};
    use async_trait::async_trait;

    fn proposal(n: u32) -> ProposalRecord {
        ProposalRecord {
            id: format!("t{:02}", n),
            title: format!("Topic {:02}", n),
            description: Some(format!("Description {}", n)),
            thesis_type: Some("Master".into()),
            supervisor: Some(SupervisorRecord {
                first_name: Some("Ada".into()),
                last_name: Some("Lovelace".into()),
                department: Some("Informatics".into()),
            }),
            tags: if n % 2 == 0 { vec!["Robotics".into()] } else { vec![] },
            ..Default::default()
        }
    }

    fn store(count: u32) -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::new().with_proposals((1..=count).map(proposal).collect()))
    }

    fn assembler(
        store: Arc<dyn ProposalStore>,
        source: impl RecommendationSource + 'static,
    ) -> TopicPageAssembler {
        TopicPageAssembler::new(store, Arc::new(source), MergeSettings::default())
    }

    fn ids(topics: &[ThesisProposalSummary]) -> Vec<&str> {
        topics.iter().map(|t| t.id.as_str()).collect()
    }

    fn recs(ids: &[&str]) -> Vec<RecommendationItem> {
        ids.iter().map(|id| RecommendationItem::new(*id)).collect()
    }

    fn params(page: i64, limit: i64, student: Option<&str>) -> TopicsParams {
        TopicsParams {
            search: None,
            page,
            limit,
            student_id: student.map(str::to_string),
        }
    }

    struct SlowRecommendations;

    #[async_trait]
    impl RecommendationSource for SlowRecommendations {
        async fn recommend(&self, _student_id: &str) -> Result<Vec<RecommendationItem>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(recs(&["t05"]))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    /// Serves windows normally but fails the unbounded lookup-table fetch
    struct UniverseFails(InMemoryCatalog, u64);

    #[async_trait]
    impl ProposalStore for UniverseFails {
        async fn count(&self, filter: &ProposalFilter) -> Result<u64> {
            self.0.count(filter).await
        }

        async fn page(
            &self,
            filter: &ProposalFilter,
            order: ListingOrder,
            offset: u64,
            limit: u64,
        ) -> Result<Vec<ProposalRecord>> {
            if limit == self.1 {
                return Err(AppError::DatabaseConnection {
                    message: "lookup failed".into(),
                });
            }
            self.0.page(filter, order, offset, limit).await
        }
    }

    #[tokio::test]
    async fn test_plain_page_is_title_ordered() {
        let assembler = assembler(store(12), StaticRecommendations::new());
        let page = assembler.assemble(None, 2, 5, None).await.unwrap();

        assert_eq!(ids(&page.topics), vec!["t06", "t07", "t08", "t09", "t10"]);
        assert_eq!(page.pagination.total_count(), 12);
        assert_eq!(page.pagination.total_pages(), 3);
        assert!(page.pagination.has_next_page());
        assert!(page.pagination.has_previous_page());
        assert_eq!(page.recommended, 0);
    }

    #[tokio::test]
    async fn test_recommendations_lead_the_first_page() {
        let source = StaticRecommendations::new().with("s1", recs(&["t07", "t03", "t09", "t01", "t05"]));
        let assembler = assembler(store(12), source);

        let page = assembler.assemble(None, 1, 10, Some("s1")).await.unwrap();

        assert_eq!(
            ids(&page.topics),
            vec!["t07", "t03", "t09", "t01", "t05", "t02", "t04", "t06", "t08", "t10"]
        );
        assert_eq!(page.recommended, 5);
        assert_eq!(page.pagination.total_count(), 12);
        assert_eq!(page.pagination.total_pages(), 2);
    }

    #[tokio::test]
    async fn test_recommendation_outside_plain_page_is_pulled_in() {
        let source = StaticRecommendations::new().with("s1", recs(&["t12", "ghost", "t12"]));
        let assembler = assembler(store(12), source);

        let page = assembler.assemble(None, 1, 10, Some("s1")).await.unwrap();

        assert_eq!(page.topics.len(), 10);
        assert_eq!(page.topics[0].id, "t12");
        assert_eq!(&ids(&page.topics)[1..], &["t01", "t02", "t03", "t04", "t05", "t06", "t07", "t08", "t09"]);
        assert_eq!(page.recommended, 1);
    }

    #[tokio::test]
    async fn test_recommendations_beyond_page_size_are_cut() {
        let source = StaticRecommendations::new().with("s1", recs(&["t05", "t06", "t07", "t08"]));
        let assembler = assembler(store(12), source);

        let page = assembler.assemble(None, 1, 3, Some("s1")).await.unwrap();
        assert_eq!(ids(&page.topics), vec!["t05", "t06", "t07"]);
    }

    #[tokio::test]
    async fn test_later_pages_are_never_personalized() {
        let source = StaticRecommendations::new().with("s1", recs(&["t12", "t11"]));
        let assembler = assembler(store(25), source);

        let personal = assembler.list_topics(params(2, 10, Some("s1"))).await;
        let anonymous = assembler.list_topics(params(2, 10, None)).await;

        assert_eq!(
            serde_json::to_value(&personal).unwrap(),
            serde_json::to_value(&anonymous).unwrap()
        );
    }

    #[tokio::test]
    async fn test_failing_source_matches_anonymous_listing() {
        let assembler_failing = assembler(store(12), StaticRecommendations::failing());

        let personal = assembler_failing.list_topics(params(1, 10, Some("s1"))).await;
        let anonymous = assembler_failing.list_topics(params(1, 10, None)).await;

        assert!(personal.success);
        assert_eq!(
            serde_json::to_value(&personal).unwrap(),
            serde_json::to_value(&anonymous).unwrap()
        );
    }

    #[tokio::test]
    async fn test_slow_source_is_time_boxed() {
        let settings = MergeSettings {
            universe_limit: 500,
            timeout: Duration::from_millis(20),
        };
        let assembler = TopicPageAssembler::new(store(12), Arc::new(SlowRecommendations), settings);

        let started = Instant::now();
        let page = assembler.assemble(None, 1, 10, Some("s1")).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(page.topics[0].id, "t01");
        assert_eq!(page.recommended, 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_back_to_plain_page() {
        let settings = MergeSettings::default();
        let inner = InMemoryCatalog::new().with_proposals((1..=12).map(proposal).collect());
        let store = Arc::new(UniverseFails(inner, settings.universe_limit));
        let source = StaticRecommendations::new().with("s1", recs(&["t09"]));
        let assembler = TopicPageAssembler::new(store, Arc::new(source), settings);

        let page = assembler.assemble(None, 1, 10, Some("s1")).await.unwrap();
        assert_eq!(page.topics[0].id, "t01");
        assert_eq!(page.recommended, 0);
    }

    #[tokio::test]
    async fn test_blank_student_is_anonymous() {
        let source = StaticRecommendations::new().with("", recs(&["t09"]));
        let assembler = assembler(store(12), source);

        let page = assembler.assemble(None, 1, 10, Some("   ")).await.unwrap();
        assert_eq!(page.topics[0].id, "t01");
    }

    #[tokio::test]
    async fn test_search_narrows_count_and_lookup() {
        let source = StaticRecommendations::new().with("s1", recs(&["t03", "t04"]));
        let assembler = assembler(store(12), source);

        let page = assembler.assemble(Some(" robotics "), 1, 10, Some("s1")).await.unwrap();

        // t03 carries no Robotics tag, so it is not in the lookup table
        assert_eq!(page.pagination.total_count(), 6);
        assert_eq!(ids(&page.topics), vec!["t04", "t02", "t06", "t08", "t10", "t12"]);
    }

    #[tokio::test]
    async fn test_store_failure_yields_empty_envelope() {
        let failing: Arc<dyn ProposalStore> = Arc::new(InMemoryCatalog::failing());
        let assembler = assembler(failing, StaticRecommendations::new());

        let response = assembler.list_topics(params(3, 10, Some("s1"))).await;

        assert!(!response.success);
        assert_eq!(response.outcome, Outcome::Failed);
        assert!(response.topics.is_empty());
        assert_eq!(response.pagination.total_count(), 0);
        assert_eq!(response.pagination.total_pages(), 0);
        assert_eq!(response.pagination.current_page(), 3);
        assert_eq!(response.message.as_deref(), Some("Failed to fetch topics"));
    }

    #[tokio::test]
    async fn test_invalid_paging_yields_validation_envelope() {
        let assembler = assembler(store(12), StaticRecommendations::new());

        for bad in [params(0, 10, None), params(1, 0, None), params(1, -3, None), params(1, 101, None)] {
            let response = assembler.list_topics(bad).await;
            assert!(!response.success);
            assert_eq!(response.outcome, Outcome::Invalid);
            assert!(response.topics.is_empty());
            assert_eq!(response.pagination.total_count(), 0);
            assert_eq!(response.pagination.total_pages(), 0);
            assert!(!response.details.unwrap_or_default().is_empty());
        }

        assert!(assembler.assemble(None, 1, 0, None).await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_page_is_a_validation_error() {
        let assembler = assembler(store(12), StaticRecommendations::new());

        let response = assembler.list_topics(params(i64::MAX, 10, None)).await;
        assert_eq!(response.outcome, Outcome::Invalid);
        assert_eq!(response.details.unwrap()[0].field, "page");
    }

    #[test]
    fn test_merge_keeps_recommended_order() {
        let summary = |id: &str| ThesisProposalSummary::from(&ProposalRecord {
            id: id.into(),
            title: id.into(),
            ..Default::default()
        });

        let merged = merge_recommended(
            vec![summary("c"), summary("a")],
            vec![summary("a"), summary("b"), summary("c"), summary("d")],
            3,
        );
        assert_eq!(ids(&merged), vec!["c", "a", "b"]);

        let merged = merge_recommended(vec![], vec![summary("a"), summary("b")], 5);
        assert_eq!(ids(&merged), vec!["a", "b"]);
    }
}
