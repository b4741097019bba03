//! HTTP middleware: request tracking.
//!
//! Every request runs inside its own tracing span carrying a generated
//! request id, so downstream log lines correlate without any process-global
//! context. The span plus prometheus counters replace a separate access log.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

use crate::metrics;

/// Record a structured log line and prometheus counters for every request.
///
/// The metrics path label uses the matched route pattern, not the raw URI,
/// to keep label cardinality bounded.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        %request_id,
        method = %method,
        path = %path,
    );

    let response = next.run(request).instrument(span).await;

    let status = response.status();
    let latency = start.elapsed();

    metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), &path, status.as_str()])
        .inc();
    metrics::HTTP_REQUEST_DURATION
        .with_label_values(&[method.as_str(), &path])
        .observe(latency.as_secs_f64());

    if status.is_server_error() {
        tracing::error!(
            %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            "Request failed"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            "Request rejected"
        );
    } else {
        tracing::debug!(
            %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            "Request completed"
        );
    }

    response
}
