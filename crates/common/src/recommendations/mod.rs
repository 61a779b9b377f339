//! Recommendation source abstraction
//!
//! A recommendation source maps a student identifier to an ordered list of
//! proposal identifiers. Implementations:
//! - HTTP endpoint returning `{ "theses": [{ "id": "...", "score": 0.9 }] }`
//! - Static table (tests, demos)
//! - Disabled (no endpoint configured)

use crate::config::RecommendationConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One recommended proposal, in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub id: String,
    #[serde(default)]
    pub score: Option<f64>,
}

impl RecommendationItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score: None,
        }
    }

    pub fn scored(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            score: Some(score),
        }
    }
}

/// Trait for recommendation lookups
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Ordered recommendations for a student
    async fn recommend(&self, student_id: &str) -> Result<Vec<RecommendationItem>>;

    /// Short name used in logs and metrics
    fn name(&self) -> &str;
}

/// Wire shape of the recommendation endpoint
#[derive(Deserialize)]
struct RecommendationsResponse {
    theses: Vec<RecommendationItem>,
}

/// Recommendations served over HTTP
pub struct HttpRecommendationSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRecommendationSource {
    /// Create a client; `timeout` bounds every request end to end
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RecommendationSource for HttpRecommendationSource {
    async fn recommend(&self, student_id: &str) -> Result<Vec<RecommendationItem>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("studentId", student_id)])
            .send()
            .await
            .map_err(|e| AppError::Recommendation {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Recommendation {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: RecommendationsResponse =
            response.json().await.map_err(|e| AppError::Recommendation {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(result.theses)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Fixed recommendations per student
#[derive(Default)]
pub struct StaticRecommendations {
    by_student: HashMap<String, Vec<RecommendationItem>>,
    failing: bool,
}

impl StaticRecommendations {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose every call fails
    pub fn failing() -> Self {
        Self {
            by_student: HashMap::new(),
            failing: true,
        }
    }

    pub fn with(mut self, student_id: impl Into<String>, items: Vec<RecommendationItem>) -> Self {
        self.by_student.insert(student_id.into(), items);
        self
    }
}

#[async_trait]
impl RecommendationSource for StaticRecommendations {
    async fn recommend(&self, student_id: &str) -> Result<Vec<RecommendationItem>> {
        if self.failing {
            return Err(AppError::Recommendation {
                message: "static source configured to fail".to_string(),
            });
        }
        Ok(self.by_student.get(student_id).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Used when no endpoint is configured: never recommends anything
pub struct DisabledRecommendations;

#[async_trait]
impl RecommendationSource for DisabledRecommendations {
    async fn recommend(&self, _student_id: &str) -> Result<Vec<RecommendationItem>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

/// Create a recommendation source based on configuration
pub fn create_recommendation_source(
    config: &RecommendationConfig,
) -> Result<Arc<dyn RecommendationSource>> {
    match config.endpoint.as_deref().map(str::trim) {
        Some(endpoint) if !endpoint.is_empty() => {
            let source = HttpRecommendationSource::new(
                endpoint,
                Duration::from_millis(config.timeout_ms),
            )?;
            Ok(Arc::new(source))
        }
        _ => {
            tracing::warn!("No recommendation endpoint configured, personalization disabled");
            Ok(Arc::new(DisabledRecommendations))
        }
    }
}
