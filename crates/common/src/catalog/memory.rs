//! In-memory catalog store
//!
//! Implements every store trait over plain vectors. Backs the catalog and
//! gateway tests; it can also be built to fail every call.

use super::{
    ListingOrder, ProposalFilter, ProposalRecord, ProposalStore, SupervisorProfile,
    SupervisorStore, TagStore,
};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    proposals: Vec<ProposalRecord>,
    tags: Vec<String>,
    supervisors: Vec<SupervisorProfile>,
    failing: bool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every query fails, to exercise fail-soft paths
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_proposals(mut self, proposals: Vec<ProposalRecord>) -> Self {
        self.proposals = proposals;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_supervisors(mut self, supervisors: Vec<SupervisorProfile>) -> Self {
        self.supervisors = supervisors;
        self
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(AppError::DatabaseConnection {
                message: "in-memory catalog configured to fail".to_string(),
            });
        }
        Ok(())
    }
}

fn window<T>(items: Vec<T>, offset: u64, limit: u64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

fn contains_ci(value: Option<&str>, term: &str) -> bool {
    value.is_some_and(|v| v.to_lowercase().contains(&term.to_lowercase()))
}

fn tag_matches(tag: &str, search: Option<&str>) -> bool {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or(true, |s| contains_ci(Some(tag), s))
}

fn supervisor_matches(profile: &SupervisorProfile, search: Option<&str>) -> bool {
    let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) else {
        return true;
    };
    contains_ci(profile.first_name.as_deref(), term)
        || contains_ci(profile.last_name.as_deref(), term)
        || contains_ci(profile.department.as_deref(), term)
}

fn compare(order: ListingOrder, a: &ProposalRecord, b: &ProposalRecord) -> Ordering {
    let primary = match order {
        ListingOrder::TitleAsc => a.title.cmp(&b.title),
        // newest first, undated last
        ListingOrder::ApplicationStartDesc => match (a.application_start, b.application_start) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl ProposalStore for InMemoryCatalog {
    async fn count(&self, filter: &ProposalFilter) -> Result<u64> {
        self.check()?;
        Ok(self.proposals.iter().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn page(
        &self,
        filter: &ProposalFilter,
        order: ListingOrder,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ProposalRecord>> {
        self.check()?;
        let mut matching: Vec<ProposalRecord> = self
            .proposals
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| compare(order, a, b));
        Ok(window(matching, offset, limit))
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }
}

#[async_trait]
impl TagStore for InMemoryCatalog {
    async fn count_tags(&self, search: Option<&str>) -> Result<u64> {
        self.check()?;
        Ok(self.tags.iter().filter(|t| tag_matches(t, search)).count() as u64)
    }

    async fn tag_page(&self, search: Option<&str>, offset: u64, limit: u64) -> Result<Vec<String>> {
        self.check()?;
        let mut matching: Vec<String> = self
            .tags
            .iter()
            .filter(|t| tag_matches(t, search))
            .cloned()
            .collect();
        matching.sort();
        Ok(window(matching, offset, limit))
    }

    async fn existing_tags(&self, names: &[String]) -> Result<Vec<String>> {
        self.check()?;
        let mut found: Vec<String> = self
            .tags
            .iter()
            .filter(|t| names.contains(t))
            .cloned()
            .collect();
        found.sort();
        found.dedup();
        Ok(found)
    }
}

#[async_trait]
impl SupervisorStore for InMemoryCatalog {
    async fn count_supervisors(&self, search: Option<&str>) -> Result<u64> {
        self.check()?;
        Ok(self
            .supervisors
            .iter()
            .filter(|s| supervisor_matches(s, search))
            .count() as u64)
    }

    async fn supervisor_page(
        &self,
        search: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SupervisorProfile>> {
        self.check()?;
        let mut matching: Vec<SupervisorProfile> = self
            .supervisors
            .iter()
            .filter(|s| supervisor_matches(s, search))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(window(matching, offset, limit))
    }
}
