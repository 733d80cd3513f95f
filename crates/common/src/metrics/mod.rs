//! Metrics and observability utilities
//!
//! Prometheus-style counters and histograms with standardized naming.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Synthese metrics
pub const METRICS_PREFIX: &str = "synthese";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms (argon2 lands around here)
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
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
        format!("{}_logins_total", METRICS_PREFIX),
        Unit::Count,
        "Login attempts by outcome"
    );

    describe_counter!(
        format!("{}_articles_total", METRICS_PREFIX),
        Unit::Count,
        "Article mutations by operation"
    );

    describe_counter!(
        format!("{}_keywords_created_total", METRICS_PREFIX),
        Unit::Count,
        "Keywords created"
    );

    describe_counter!(
        format!("{}_password_resets_total", METRICS_PREFIX),
        Unit::Count,
        "Password reset requests and completions"
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

pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "rejected" };
    counter!(
        format!("{}_logins_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

/// `operation` is one of create, update, delete
pub fn record_article(operation: &'static str) {
    counter!(
        format!("{}_articles_total", METRICS_PREFIX),
        "operation" => operation
    )
    .increment(1);
}

pub fn record_keyword_created() {
    counter!(format!("{}_keywords_created_total", METRICS_PREFIX)).increment(1);
}

/// `stage` is requested or completed
pub fn record_password_reset(stage: &'static str) {
    counter!(
        format!("{}_password_resets_total", METRICS_PREFIX),
        "stage" => stage
    )
    .increment(1);
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
    fn test_recorders_without_exporter() {
        // No recorder installed: every helper must be a no-op, not a panic
        RequestMetrics::start("GET", "/index").finish(200);
        record_login(true);
        record_article("create");
        record_keyword_created();
        record_password_reset("requested");
    }
}
