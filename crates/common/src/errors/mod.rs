//! Error types for Thesisboard services
//!
//! Provides:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Field-level validation details

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidInput,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    RecommendationError,
    RecommendationTimeout,

    // Internal errors (9xxx)
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidInput => 1002,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::RecommendationError => 8002,
            ErrorCode::RecommendationTimeout => 8003,

            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// A single rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid input parameters")]
    InvalidInput { violations: Vec<FieldViolation> },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Recommendation service error: {message}")]
    Recommendation { message: String },

    #[error("Recommendation timeout after {timeout_ms}ms")]
    RecommendationTimeout { timeout_ms: u64 },

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidInput { .. } => ErrorCode::InvalidInput,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Recommendation { .. } => ErrorCode::RecommendationError,
            AppError::RecommendationTimeout { .. } => ErrorCode::RecommendationTimeout,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Recommendation { .. } | AppError::RecommendationTimeout { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Field-level details for validation failures
    pub fn violations(&self) -> Vec<FieldViolation> {
        match self {
            AppError::InvalidInput { violations } => violations.clone(),
            AppError::Validation { message, field } => vec![FieldViolation::new(
                field.clone().unwrap_or_else(|| "input".to_string()),
                "invalid",
                message.clone(),
            )],
            _ => Vec::new(),
        }
    }
}

/// snake_case struct field to its camelCase JSON name
fn wire_name(field: &str) -> String {
    let mut name = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            name.extend(c.to_uppercase());
            upper = false;
        } else {
            name.push(c);
        }
    }
    name
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut violations: Vec<FieldViolation> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = wire_name(field);
                errs.iter().map(move |err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    FieldViolation::new(field.clone(), err.code.to_string(), message)
                })
            })
            .collect();

        // field_errors() is a HashMap, keep the output stable
        violations.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));

        AppError::InvalidInput { violations }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let violations = self.violations();
        let details = if violations.is_empty() {
            None
        } else {
            serde_json::to_value(violations).ok()
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(range(min = 1))]
        page: i64,
        #[validate(length(min = 1, message = "At least one field must be selected"))]
        fields: Vec<String>,
    }

    #[derive(Validate)]
    struct FilterBody {
        #[validate(range(min = 1, max = 50))]
        items_per_page: i64,
        #[validate(length(min = 1))]
        selected_field_ids: Vec<String>,
    }

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::RecommendationTimeout { timeout_ms: 250 };
        assert_eq!(err.code(), ErrorCode::RecommendationTimeout);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code().as_code(), 8003);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "page must be at least 1".into(),
            field: Some("page".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
        assert_eq!(err.violations()[0].field, "page");
    }

    #[test]
    fn test_validator_errors_are_sorted_violations() {
        let probe = Probe { page: 0, fields: vec![] };
        let err = AppError::from(probe.validate().unwrap_err());

        let violations = err.violations();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].field, "fields");
        assert_eq!(violations[0].message, "At least one field must be selected");
        assert_eq!(violations[1].field, "page");
        assert_eq!(violations[1].code, "range");
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[test]
    fn test_validator_fields_use_camel_case() {
        let body = FilterBody { items_per_page: 0, selected_field_ids: vec![] };
        let err = AppError::from(body.validate().unwrap_err());

        let fields: Vec<String> = err.violations().into_iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["itemsPerPage", "selectedFieldIds"]);
        assert_eq!(wire_name("page"), "page");
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Configuration {
            message: "rate_limit.requests_per_second must be positive".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
        assert!(err.violations().is_empty());
    }
}
