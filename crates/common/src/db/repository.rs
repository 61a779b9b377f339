//! Repository pattern for database operations
//!
//! Implements the catalog store traits over Postgres. Proposal and
//! supervisor listings are raw joined SQL (every join is to-one, so rows
//! never fan out); tag links and tag lookups use the SeaORM entities.

use crate::catalog::{
    ListingOrder, ProposalFilter, ProposalRecord, ProposalStore, SupervisorProfile,
    SupervisorRecord, SupervisorStore, TagStore,
};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, QueryResult, Statement, Value,
};
use std::collections::HashMap;
use tracing::debug;

const PROPOSAL_FROM: &str = r#"
    FROM thesis_proposal tp
    LEFT JOIN supervisor s ON s.supervisor_id = tp.supervisor_id
    LEFT JOIN user_parent up ON up.user_id = s.user_id
    LEFT JOIN faculty f ON f.faculty_id = up.faculty_id
"#;

const SUPERVISOR_FROM: &str = r#"
    FROM supervisor s
    LEFT JOIN user_parent up ON up.user_id = s.user_id
    LEFT JOIN faculty f ON f.faculty_id = up.faculty_id
"#;

/// Positional bind values for a statement under construction
#[derive(Default)]
struct Binds {
    values: Vec<Value>,
}

impl Binds {
    /// Push a value, return its `$n` placeholder
    fn bind(&mut self, value: impl Into<Value>) -> String {
        self.values.push(value.into());
        format!("${}", self.values.len())
    }

    /// Bind LIMIT and OFFSET, rejecting values Postgres cannot take as BIGINT
    fn window(&mut self, limit: u64, offset: u64) -> Result<(String, String)> {
        let limit = i64::try_from(limit).map_err(|_| AppError::Validation {
            message: format!("page size {} is out of range", limit),
            field: Some("limit".to_string()),
        })?;
        let offset = i64::try_from(offset).map_err(|_| AppError::Validation {
            message: format!("offset {} is out of range", offset),
            field: Some("page".to_string()),
        })?;
        Ok((self.bind(limit), self.bind(offset)))
    }

    fn statement(self, sql: &str) -> Statement {
        Statement::from_sql_and_values(DbBackend::Postgres, sql, self.values)
    }
}

/// `%term%` with LIKE metacharacters escaped
fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn proposal_where(filter: &ProposalFilter, binds: &mut Binds) -> String {
    let mut clauses = Vec::new();

    if !filter.tags().is_empty() {
        let placeholders: Vec<String> = filter
            .tags()
            .iter()
            .map(|tag| binds.bind(tag.as_str()))
            .collect();
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM thesis_proposal_tag tpt \
             WHERE tpt.thesis_id = tp.thesis_id AND tpt.tag_name IN ({}))",
            placeholders.join(", ")
        ));
    }

    if let Some(term) = filter.search_term() {
        let p = binds.bind(contains_pattern(term));
        clauses.push(format!(
            "(tp.title ILIKE {p} OR tp.description ILIKE {p} OR tp.requirements ILIKE {p} \
             OR up.name ILIKE {p} OR up.surname ILIKE {p} \
             OR EXISTS (SELECT 1 FROM thesis_proposal_tag tpt \
                        WHERE tpt.thesis_id = tp.thesis_id AND tpt.tag_name ILIKE {p}))"
        ));
    }

    if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    }
}

fn supervisor_where(search: Option<&str>, binds: &mut Binds) -> String {
    match search {
        Some(term) => {
            let p = binds.bind(contains_pattern(term));
            format!("WHERE (up.name ILIKE {p} OR up.surname ILIKE {p} OR f.faculty_name ILIKE {p})")
        }
        None => String::new(),
    }
}

fn tag_where(search: Option<&str>, binds: &mut Binds) -> String {
    match search {
        Some(term) => format!("WHERE tag_name ILIKE {}", binds.bind(contains_pattern(term))),
        None => String::new(),
    }
}

fn order_clause(order: ListingOrder) -> &'static str {
    match order {
        ListingOrder::TitleAsc => "ORDER BY tp.title ASC, tp.thesis_id",
        ListingOrder::ApplicationStartDesc => {
            "ORDER BY tp.application_start DESC NULLS LAST, tp.thesis_id"
        }
    }
}

fn total(row: Option<QueryResult>) -> Result<u64> {
    match row {
        Some(row) => Ok(row.try_get::<i64>("", "total")?.max(0) as u64),
        None => Ok(0),
    }
}

fn proposal_from_row(row: &QueryResult) -> Result<ProposalRecord> {
    let supervisor_id: Option<String> = row.try_get("", "supervisor_id")?;
    let supervisor = match supervisor_id {
        Some(_) => Some(SupervisorRecord {
            first_name: row.try_get("", "first_name")?,
            last_name: row.try_get("", "last_name")?,
            department: row.try_get("", "faculty_name")?,
        }),
        None => None,
    };

    Ok(ProposalRecord {
        id: row.try_get("", "thesis_id")?,
        title: row.try_get::<Option<String>>("", "title")?.unwrap_or_default(),
        description: row.try_get("", "description")?,
        requirements: row.try_get("", "requirements")?,
        thesis_type: row.try_get("", "thesis_type")?,
        application_start: row.try_get("", "application_start")?,
        application_end: row.try_get("", "application_end")?,
        supervisor,
        tags: Vec::new(),
    })
}

fn supervisor_from_row(row: &QueryResult) -> Result<SupervisorProfile> {
    Ok(SupervisorProfile {
        id: row.try_get("", "supervisor_id")?,
        first_name: row.try_get("", "first_name")?,
        last_name: row.try_get("", "last_name")?,
        department: row.try_get("", "faculty_name")?,
    })
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Tag names per proposal, in link order
    async fn tags_for(&self, ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let links = ThesisProposalTagEntity::find()
            .filter(ThesisProposalTagColumn::ThesisId.is_in(ids.iter().cloned()))
            .order_by_asc(ThesisProposalTagColumn::Id)
            .all(self.conn())
            .await?;

        let mut by_proposal: HashMap<String, Vec<String>> = HashMap::new();
        for link in links {
            by_proposal.entry(link.thesis_id).or_default().push(link.tag_name);
        }
        Ok(by_proposal)
    }
}

#[async_trait]
impl ProposalStore for Repository {
    async fn count(&self, filter: &ProposalFilter) -> Result<u64> {
        let mut binds = Binds::default();
        let sql = format!(
            "SELECT COUNT(*) AS total {} {}",
            PROPOSAL_FROM,
            proposal_where(filter, &mut binds)
        );

        let row = self.conn().query_one(binds.statement(&sql)).await?;
        total(row)
    }

    async fn page(
        &self,
        filter: &ProposalFilter,
        order: ListingOrder,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ProposalRecord>> {
        let mut binds = Binds::default();
        let where_clause = proposal_where(filter, &mut binds);
        let (limit_p, offset_p) = binds.window(limit, offset)?;

        let sql = format!(
            r#"
            SELECT
                tp.thesis_id::text AS thesis_id,
                tp.title,
                tp.description,
                tp.requirements,
                tp.thesis_type,
                tp.application_start,
                tp.application_end,
                s.supervisor_id::text AS supervisor_id,
                up.name AS first_name,
                up.surname AS last_name,
                f.faculty_name
            {PROPOSAL_FROM}
            {where_clause}
            {order}
            LIMIT {limit_p} OFFSET {offset_p}
            "#,
            order = order_clause(order),
        );

        let rows = self.conn().query_all(binds.statement(&sql)).await?;
        let mut records = rows
            .iter()
            .map(proposal_from_row)
            .collect::<Result<Vec<_>>>()?;

        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let mut tags = self.tags_for(&ids).await?;
        for record in &mut records {
            record.tags = tags.remove(&record.id).unwrap_or_default();
        }

        debug!(offset, limit, returned = records.len(), "Loaded proposal page");
        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

#[async_trait]
impl TagStore for Repository {
    async fn count_tags(&self, search: Option<&str>) -> Result<u64> {
        let mut binds = Binds::default();
        let sql = format!("SELECT COUNT(*) AS total FROM tag {}", tag_where(search, &mut binds));

        let row = self.conn().query_one(binds.statement(&sql)).await?;
        total(row)
    }

    async fn tag_page(&self, search: Option<&str>, offset: u64, limit: u64) -> Result<Vec<String>> {
        let mut binds = Binds::default();
        let where_clause = tag_where(search, &mut binds);
        let (limit_p, offset_p) = binds.window(limit, offset)?;
        let sql = format!(
            "SELECT tag_name FROM tag {where_clause} ORDER BY tag_name ASC LIMIT {limit_p} OFFSET {offset_p}"
        );

        self.conn()
            .query_all(binds.statement(&sql))
            .await?
            .iter()
            .map(|row| row.try_get::<String>("", "tag_name").map_err(AppError::from))
            .collect()
    }

    async fn existing_tags(&self, names: &[String]) -> Result<Vec<String>> {
        let tags = TagEntity::find()
            .filter(TagColumn::TagName.is_in(names.iter().cloned()))
            .order_by_asc(TagColumn::TagName)
            .all(self.conn())
            .await?;

        Ok(tags.into_iter().map(|t| t.tag_name).collect())
    }
}

#[async_trait]
impl SupervisorStore for Repository {
    async fn count_supervisors(&self, search: Option<&str>) -> Result<u64> {
        let mut binds = Binds::default();
        let sql = format!(
            "SELECT COUNT(*) AS total {} {}",
            SUPERVISOR_FROM,
            supervisor_where(search, &mut binds)
        );

        let row = self.conn().query_one(binds.statement(&sql)).await?;
        total(row)
    }

    async fn supervisor_page(
        &self,
        search: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SupervisorProfile>> {
        let mut binds = Binds::default();
        let where_clause = supervisor_where(search, &mut binds);
        let (limit_p, offset_p) = binds.window(limit, offset)?;

        let sql = format!(
            r#"
            SELECT
                s.supervisor_id::text AS supervisor_id,
                up.name AS first_name,
                up.surname AS last_name,
                f.faculty_name
            {SUPERVISOR_FROM}
            {where_clause}
            ORDER BY up.surname ASC NULLS LAST, s.supervisor_id
            LIMIT {limit_p} OFFSET {offset_p}
            "#
        );

        self.conn()
            .query_all(binds.statement(&sql))
            .await?
            .iter()
            .map(supervisor_from_row)
            .collect()
    }
}
