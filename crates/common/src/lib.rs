//! Thesisboard Common Library
//!
//! Shared code for the Thesisboard services including:
//! - Catalog listings (topics, fields, professors) and their store traits
//! - Postgres repository and connection pool
//! - Recommendation source abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod recommendations;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use recommendations::RecommendationSource;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
