//! Metrics definitions for the cafe service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `cafe_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: HTTP methods only
//! - `endpoint`: the fixed route set, dynamic ids replaced by `{id}`
//! - `status`: success, error, timeout
//! - `outcome`: `granted` or one of the denial kinds

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("cafe_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Key set fetches cross the network; timeouts default to 10s
        .set_buckets_for_metric(
            Matcher::Prefix("cafe_jwks_refresh".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set key set refresh buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `cafe_http_requests_total`, `cafe_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("cafe_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("cafe_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto the fixed route set.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/drinks" => "/drinks",
        "/drinks-detail" => "/drinks-detail",
        _ => match path.strip_prefix("/drinks/") {
            Some(id) if !id.is_empty() && !id.contains('/') => "/drinks/{id}",
            _ => "/other",
        },
    }
}

// ============================================================================
// Authorization Metrics
// ============================================================================

/// Record one authorization decision.
///
/// Metric: `cafe_auth_decisions_total`
/// Labels: `outcome` (`granted` or the denial kind)
pub fn record_auth_decision(outcome: &'static str) {
    counter!("cafe_auth_decisions_total", "outcome" => outcome).increment(1);
}

/// Record one key set fetch.
///
/// Metric: `cafe_jwks_refresh_total`, `cafe_jwks_refresh_duration_seconds`
/// Labels: `status` (success, error, timeout)
pub fn record_jwks_refresh(status: &'static str, duration: Duration) {
    histogram!("cafe_jwks_refresh_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
    counter!("cafe_jwks_refresh_total", "status" => status).increment(1);
}
