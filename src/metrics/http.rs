//! Process-local request metrics with Prometheus text exposition.

use dashmap::DashMap;
use opentelemetry::KeyValue;
use std::fmt::Write;
use std::time::Duration;

use super::{
    http_request_duration, http_requests_total, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION_SECONDS,
};

/// Upper bounds of the latency histogram buckets, in seconds
pub const LATENCY_BUCKETS: [f64; 9] = [0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct RequestKey {
    method: String,
    path: String,
    status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct RouteKey {
    method: String,
    path: String,
}

#[derive(Debug, Clone, Default)]
struct LatencyHistogram {
    /// Non-cumulative: each observation lands in its first fitting bucket
    buckets: [u64; LATENCY_BUCKETS.len()],
    count: u64,
    sum: f64,
}

impl LatencyHistogram {
    fn observe(&mut self, seconds: f64) {
        if let Some(index) = LATENCY_BUCKETS.iter().position(|bound| seconds <= *bound) {
            self.buckets[index] += 1;
        }
        self.count += 1;
        self.sum += seconds;
    }
}

/// Counters and latency histograms keyed by method, route and status
#[derive(Debug, Default)]
pub struct HttpMetrics {
    requests: DashMap<RequestKey, u64>,
    latency: DashMap<RouteKey, LatencyHistogram>,
}

impl HttpMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed request
    pub fn record(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();

        *self
            .requests
            .entry(RequestKey {
                method: method.to_string(),
                path: path.to_string(),
                status,
            })
            .or_insert(0) += 1;

        self.latency
            .entry(RouteKey {
                method: method.to_string(),
                path: path.to_string(),
            })
            .or_default()
            .observe(seconds);

        http_requests_total().add(
            1,
            &[
                KeyValue::new("method", method.to_string()),
                KeyValue::new("path", path.to_string()),
                KeyValue::new("status", i64::from(status)),
            ],
        );
        http_request_duration().record(
            seconds,
            &[
                KeyValue::new("method", method.to_string()),
                KeyValue::new("path", path.to_string()),
            ],
        );
    }

    /// Requests seen so far for one label set
    pub fn request_count(&self, method: &str, path: &str, status: u16) -> u64 {
        self.requests
            .get(&RequestKey {
                method: method.to_string(),
                path: path.to_string(),
                status,
            })
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Render every series in the Prometheus text exposition format
    pub fn render_prometheus(&self) -> String {
        let mut requests: Vec<(RequestKey, u64)> = self
            .requests
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        requests.sort();

        let mut latency: Vec<(RouteKey, LatencyHistogram)> = self
            .latency
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        latency.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::new();

        let _ = writeln!(out, "# HELP {HTTP_REQUESTS_TOTAL} Total HTTP requests");
        let _ = writeln!(out, "# TYPE {HTTP_REQUESTS_TOTAL} counter");
        for (key, count) in &requests {
            let _ = writeln!(
                out,
                "{HTTP_REQUESTS_TOTAL}{{method=\"{}\",path=\"{}\",status=\"{}\"}} {count}",
                escape_label(&key.method),
                escape_label(&key.path),
                key.status,
            );
        }

        let _ = writeln!(
            out,
            "# HELP {HTTP_REQUEST_DURATION_SECONDS} HTTP request latency in seconds"
        );
        let _ = writeln!(out, "# TYPE {HTTP_REQUEST_DURATION_SECONDS} histogram");
        for (key, histogram) in &latency {
            let labels = format!(
                "method=\"{}\",path=\"{}\"",
                escape_label(&key.method),
                escape_label(&key.path)
            );

            let mut cumulative = 0;
            for (bound, in_bucket) in LATENCY_BUCKETS.iter().zip(histogram.buckets.iter()) {
                cumulative += in_bucket;
                let _ = writeln!(
                    out,
                    "{HTTP_REQUEST_DURATION_SECONDS}_bucket{{{labels},le=\"{bound}\"}} {cumulative}"
                );
            }
            let _ = writeln!(
                out,
                "{HTTP_REQUEST_DURATION_SECONDS}_bucket{{{labels},le=\"+Inf\"}} {}",
                histogram.count
            );
            let _ = writeln!(
                out,
                "{HTTP_REQUEST_DURATION_SECONDS}_sum{{{labels}}} {}",
                histogram.sum
            );
            let _ = writeln!(
                out,
                "{HTTP_REQUEST_DURATION_SECONDS}_count{{{labels}}} {}",
                histogram.count
            );
        }

        out
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
