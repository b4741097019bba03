//! Prometheus metrics.
//!
//! A process-wide registry with the counters operations actually watches:
//! request volume/latency, reservation contention, workflow progress and
//! expiration sweeps. Rendered by `GET /metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("http_requests_total", "HTTP requests by method, path and status"),
        &["method", "path", "status"],
    )
    .expect("valid metric definition");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new("http_request_duration_seconds", "HTTP request latency")
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method", "path"],
    )
    .expect("valid metric definition");
    REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric registered once");
    histogram
});

pub static SEAT_RESERVATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "seat_reservations_total",
            "Seat reservation attempts by outcome",
        ),
        &["outcome"],
    )
    .expect("valid metric definition");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

pub static BOOKINGS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("bookings_created_total", "Bookings created")
        .expect("valid metric definition");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

pub static BOOKINGS_EXPIRED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "bookings_expired_total",
        "Bookings cancelled by the expiration sweep",
    )
    .expect("valid metric definition");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

pub static WORKFLOW_MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "workflow_messages_total",
            "Workflow messages by subject and outcome",
        ),
        &["subject", "outcome"],
    )
    .expect("valid metric definition");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

pub static EVENTS_CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "events_cache_lookups_total",
            "Events-listing cache lookups by result",
        ),
        &["result"],
    )
    .expect("valid metric definition");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

pub static EXPIRATION_SWEEP_DURATION: Lazy<Histogram> = Lazy::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(
            "expiration_sweep_duration_seconds",
            "Duration of expiration sweeps",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0]),
    )
    .expect("valid metric definition");
    REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric registered once");
    histogram
});

/// Render the registry in the Prometheus text format
pub fn render() -> String {
    let metric_families = REGISTRY.gather();
    TextEncoder::new()
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_in_text_format() {
        BOOKINGS_CREATED_TOTAL.inc();
        SEAT_RESERVATIONS_TOTAL
            .with_label_values(&["reserved"])
            .inc();

        let output = render();
        assert!(output.contains("bookings_created_total"));
        assert!(output.contains("seat_reservations_total"));
    }
}
