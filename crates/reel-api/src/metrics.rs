//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "reel_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "reel_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "reel_http_requests_in_flight";

    // Job metrics
    pub const JOBS_CREATED_TOTAL: &str = "reel_jobs_created_total";
    pub const JOBS_PRUNED_TOTAL: &str = "reel_jobs_pruned_total";
    pub const REGISTRY_JOBS: &str = "reel_registry_jobs";

    // Result delivery
    pub const RESULTS_SERVED_TOTAL: &str = "reel_results_served_total";

    // Security metrics
    pub const SECURITY_REJECTIONS_TOTAL: &str = "reel_security_rejections_total";
    pub const RATE_LIMIT_HITS_TOTAL: &str = "reel_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_created() {
    counter!(names::JOBS_CREATED_TOTAL).increment(1);
}

pub fn record_jobs_pruned(count: usize) {
    counter!(names::JOBS_PRUNED_TOTAL).increment(count as u64);
}

pub fn set_registry_jobs(count: usize) {
    gauge!(names::REGISTRY_JOBS).set(count as f64);
}

pub fn record_result_served() {
    counter!(names::RESULTS_SERVED_TOTAL).increment(1);
}

/// Record a request refused for security reasons.
pub fn record_security_rejection(reason: &'static str) {
    counter!(names::SECURITY_REJECTIONS_TOTAL, "reason" => reason).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static JOB_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(api/jobs|results)/[^/]+").expect("job path pattern is valid")
});

/// Sanitize path for metrics labels (collapse job IDs).
fn sanitize_path(path: &str) -> String {
    JOB_PATH.replace(path, "/$1/:job_id").into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
