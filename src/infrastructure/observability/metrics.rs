//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

pub const CACHE_LOOKUPS_TOTAL: &str = "connectly_cache_lookups_total";
pub const CACHE_INVALIDATIONS_TOTAL: &str = "connectly_cache_invalidations_total";
pub const CACHE_KEYS_PURGED_TOTAL: &str = "connectly_cache_keys_purged_total";
pub const CACHE_PURGE_FAILURES_TOTAL: &str = "connectly_cache_purge_failures_total";

/// Result of one read-through lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Hit,
    Miss,
    /// Store failed; served from the source of record
    Error,
    /// Cached payload could not be decoded and was dropped
    Corrupt,
}

impl LookupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Error => "error",
            Self::Corrupt => "corrupt",
        }
    }
}

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the Prometheus recorder; `None` when disabled or already installed
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("connectly_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics initialized at /metrics");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

pub fn create_metrics_router(metrics: PrometheusMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

pub fn record_cache_lookup(kind: &str, outcome: LookupOutcome) {
    counter!(
        CACHE_LOOKUPS_TOTAL,
        "kind" => kind.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_invalidation(event: &str, purged: usize, failures: usize) {
    counter!(CACHE_INVALIDATIONS_TOTAL, "event" => event.to_string()).increment(1);
    counter!(CACHE_KEYS_PURGED_TOTAL, "event" => event.to_string()).increment(purged as u64);

    if failures > 0 {
        counter!(CACHE_PURGE_FAILURES_TOTAL, "event" => event.to_string())
            .increment(failures as u64);
    }
}

fn is_id_segment(segment: &str) -> bool {
    let numeric = !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());
    let uuid = segment.len() == 36 && uuid::Uuid::parse_str(segment).is_ok();
    numeric || uuid
}

/// Replace id segments with `{id}` and cap the length to bound label cardinality
fn sanitize_path(path: &str) -> String {
    let sanitized = path
        .split('/')
        .map(|segment| if is_id_segment(segment) { "{id}" } else { segment })
        .collect::<Vec<_>>()
        .join("/");

    sanitized.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_numeric_id() {
        assert_eq!(sanitize_path("/posts/123/like"), "/posts/{id}/like");
        assert_eq!(
            sanitize_path("/posts/4/users/9/comments"),
            "/posts/{id}/users/{id}/comments"
        );
    }

    #[test]
    fn test_sanitize_path_uuid() {
        let path = "/posts/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(sanitize_path(path), "/posts/{id}");
    }

    #[test]
    fn test_sanitize_path_no_id() {
        assert_eq!(sanitize_path("/health"), "/health");
    }

    #[test]
    fn test_sanitize_path_truncates_long_paths() {
        let path = "/very/long/path/that/exceeds/the/maximum/allowed/length/for/metrics";
        assert!(sanitize_path(path).len() <= 50);
    }

    #[test]
    fn test_lookup_outcome_labels() {
        assert_eq!(LookupOutcome::Hit.as_str(), "hit");
        assert_eq!(LookupOutcome::Corrupt.as_str(), "corrupt");
    }
}
