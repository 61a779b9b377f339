//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use thesisboard_common::{config::RateLimitConfig, errors::AppError};

/// Process-wide rate limiter using governor crate
pub type GlobalRateLimiter = DefaultDirectRateLimiter;

/// Shared limiter plus the configured rate, reported on rejection
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<GlobalRateLimiter>,
    requests_per_second: u32,
}

impl RateLimit {
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

/// Create a new rate limiter; zero rates are a configuration error
pub fn create_rate_limiter(config: &RateLimitConfig) -> Result<RateLimit, AppError> {
    let rate = NonZeroU32::new(config.requests_per_second).ok_or_else(|| AppError::Configuration {
        message: "rate_limit.requests_per_second must be positive".to_string(),
    })?;
    let burst = NonZeroU32::new(config.burst).ok_or_else(|| AppError::Configuration {
        message: "rate_limit.burst must be positive".to_string(),
    })?;

    let quota = Quota::per_second(rate).allow_burst(burst);
    Ok(RateLimit {
        limiter: Arc::new(RateLimiter::direct(quota)),
        requests_per_second: config.requests_per_second,
    })
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limit): State<RateLimit>,
    request: Request,
    next: Next,
) -> Response {
    if limit.check() {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
    AppError::RateLimited {
        limit: limit.requests_per_second,
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(requests_per_second: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second,
            burst,
            enabled: true,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = create_rate_limiter(&config(100, 200)).unwrap();
        assert!(limiter.check());
    }

    #[test]
    fn test_burst_is_enforced() {
        let limiter = create_rate_limiter(&config(1, 2)).unwrap();
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        assert!(create_rate_limiter(&config(0, 10)).is_err());
        assert!(create_rate_limiter(&config(10, 0)).is_err());
    }
}
