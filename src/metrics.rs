//! Request metrics with Prometheus text exposition.
//!
//! A middleware records every request (count by method/path/status plus a
//! latency histogram); `export` renders the accumulated values for the
//! `/metrics` endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Upper bounds of the latency histogram buckets, in seconds.
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

#[derive(Default)]
struct Histogram {
    buckets: [AtomicU64; LATENCY_BUCKETS.len()],
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    fn observe(&self, seconds: f64) {
        for (bucket, bound) in self.buckets.iter().zip(LATENCY_BUCKETS) {
            if seconds <= *bound {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.sum_micros
            .fetch_add((seconds * 1e6) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct Metrics {
    requests: Mutex<HashMap<(String, String, u16), u64>>,
    latency: Histogram,
}

fn metrics() -> &'static Metrics {
    static METRICS: OnceLock<Metrics> = OnceLock::new();
    METRICS.get_or_init(Metrics::default)
}

/// Middleware recording count and latency for every request.
pub async fn record(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    // Label by route pattern where one matched, so task ids do not explode
    // the label set.
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let start = Instant::now();
    let response = next.run(req).await;

    let m = metrics();
    m.latency.observe(start.elapsed().as_secs_f64());
    let mut requests = m.requests.lock().unwrap();
    *requests
        .entry((method, path, response.status().as_u16()))
        .or_insert(0) += 1;

    response
}

/// Content type expected by Prometheus scrapers.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics - Prometheus text exposition.
pub async fn export() -> ([(header::HeaderName, &'static str); 1], String) {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        render(metrics()),
    )
}

fn render(m: &Metrics) -> String {
    let mut out = String::new();

    out.push_str("# HELP http_requests_total Total HTTP requests\n");
    out.push_str("# TYPE http_requests_total counter\n");
    let requests = m.requests.lock().unwrap();
    let mut entries: Vec<_> = requests.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for ((method, path, status), count) in entries {
        out.push_str(&format!(
            "http_requests_total{{method=\"{}\",path=\"{}\",status=\"{}\"}} {}\n",
            method, path, status, count
        ));
    }
    drop(requests);

    out.push_str("# HELP http_request_duration_seconds Request latency\n");
    out.push_str("# TYPE http_request_duration_seconds histogram\n");
    for (bucket, bound) in m.latency.buckets.iter().zip(LATENCY_BUCKETS) {
        out.push_str(&format!(
            "http_request_duration_seconds_bucket{{le=\"{}\"}} {}\n",
            bound,
            bucket.load(Ordering::Relaxed)
        ));
    }
    let count = m.latency.count.load(Ordering::Relaxed);
    out.push_str(&format!(
        "http_request_duration_seconds_bucket{{le=\"+Inf\"}} {}\n",
        count
    ));
    out.push_str(&format!(
        "http_request_duration_seconds_sum {}\n",
        m.latency.sum_micros.load(Ordering::Relaxed) as f64 / 1e6
    ));
    out.push_str(&format!("http_request_duration_seconds_count {}\n", count));

    out
}
