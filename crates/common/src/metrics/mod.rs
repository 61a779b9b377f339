//! Metrics and observability utilities
//!
//! Prometheus metrics (via the `metrics` facade) with standardized naming.
//! Recording is a no-op until a recorder is installed by the binary.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Thesisboard metrics
pub const METRICS_PREFIX: &str = "thesisboard";

/// Histogram buckets for listing latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_listings_total", METRICS_PREFIX),
        Unit::Count,
        "Catalog listings served, by listing and outcome"
    );

    describe_histogram!(
        format!("{}_listing_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Catalog listing latency in seconds"
    );

    describe_histogram!(
        format!("{}_listing_items", METRICS_PREFIX),
        Unit::Count,
        "Items returned per listing"
    );

    describe_counter!(
        format!("{}_recommendation_fetches_total", METRICS_PREFIX),
        Unit::Count,
        "Recommendation fetches, by source and outcome"
    );

    describe_histogram!(
        format!("{}_recommendations_merged", METRICS_PREFIX),
        Unit::Count,
        "Recommended topics placed ahead of the plain page"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a catalog listing
pub fn record_listing(listing: &str, outcome: &str, duration_secs: f64, items: usize) {
    counter!(
        format!("{}_listings_total", METRICS_PREFIX),
        "listing" => listing.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_listing_duration_seconds", METRICS_PREFIX),
        "listing" => listing.to_string()
    )
    .record(duration_secs);

    histogram!(
        format!("{}_listing_items", METRICS_PREFIX),
        "listing" => listing.to_string()
    )
    .record(items as f64);
}

/// Helper to record a recommendation fetch and how many topics it promoted
pub fn record_recommendation(source: &str, outcome: &str, merged: usize) {
    counter!(
        format!("{}_recommendation_fetches_total", METRICS_PREFIX),
        "source" => source.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    if outcome == "merged" {
        histogram!(
            format!("{}_recommendations_merged", METRICS_PREFIX),
            "source" => source.to_string()
        )
        .record(merged as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recording_without_recorder() {
        let metrics = RequestMetrics::start("GET", "/api/topics");
        metrics.finish(200);
        record_listing("topics", "ok", 0.01, 10);
        record_recommendation("static", "merged", 3);
    }
}
