//! # HTTP Metrics
//!
//! Request counters and latency histograms for the API.
//!
//! Every request is recorded twice: into the process-local [`HttpMetrics`]
//! registry rendered by `GET /metrics` in the Prometheus text format, and
//! into OpenTelemetry instruments on the global meter provider, which export
//! wherever the embedding process has installed a provider.
//!
//! Paths are labelled with the matched route pattern
//! (`/api/changes/{change_id}/enqueue`), never the raw URI, so label
//! cardinality stays bounded.

pub mod http;

use opentelemetry::metrics::{Counter, Histogram, Meter};
use std::sync::OnceLock;

pub use http::{HttpMetrics, LATENCY_BUCKETS};

pub const HTTP_REQUESTS_TOTAL: &str = "opsdesk_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "opsdesk_http_request_duration_seconds";

static HTTP_METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    HTTP_METER.get_or_init(|| opentelemetry::global::meter("opsdesk-api"))
}

/// Total HTTP requests
///
/// Labels:
/// - method: HTTP method
/// - path: matched route pattern
/// - status: response status code
pub fn http_requests_total() -> Counter<u64> {
    meter()
        .u64_counter(HTTP_REQUESTS_TOTAL)
        .with_description("Total HTTP requests")
        .build()
}

/// HTTP request latency in seconds
///
/// Labels:
/// - method: HTTP method
/// - path: matched route pattern
pub fn http_request_duration() -> Histogram<f64> {
    meter()
        .f64_histogram(HTTP_REQUEST_DURATION_SECONDS)
        .with_description("HTTP request latency in seconds")
        .with_unit("s")
        .build()
}
