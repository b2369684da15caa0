//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Messages persisted, by kind
//! - Broadcast deliveries, by outcome
//! - Live listeners currently registered
//! - HTTP request counts by method, path, and status, plus latency

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::domain::MessageKind;
use crate::infrastructure::realtime::BroadcastReport;

const NAMESPACE: &str = "chat_delivery";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Messages persisted, labelled by kind ("user", "system")
pub static MESSAGES_POSTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_posted_total", "Total number of persisted messages")
            .namespace(NAMESPACE),
        &["kind"],
    )
    .expect("Failed to create MESSAGES_POSTED_TOTAL metric")
});

/// Per-listener delivery outcomes ("delivered", "dropped_oldest", "disconnected", "skipped")
pub static BROADCAST_DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "broadcast_deliveries_total",
            "Total number of per-listener broadcast outcomes",
        )
        .namespace(NAMESPACE),
        &["outcome"],
    )
    .expect("Failed to create BROADCAST_DELIVERIES_TOTAL metric")
});

/// Live listeners across all chats
pub static LISTENERS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("listeners_active", "Number of registered live listeners").namespace(NAMESPACE),
    )
    .expect("Failed to create LISTENERS_ACTIVE metric")
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(MESSAGES_POSTED_TOTAL.clone()))
        .expect("Failed to register MESSAGES_POSTED_TOTAL");
    registry
        .register(Box::new(BROADCAST_DELIVERIES_TOTAL.clone()))
        .expect("Failed to register BROADCAST_DELIVERIES_TOTAL");
    registry
        .register(Box::new(LISTENERS_ACTIVE.clone()))
        .expect("Failed to register LISTENERS_ACTIVE");
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Count one persisted message
pub fn record_message(kind: MessageKind) {
    MESSAGES_POSTED_TOTAL
        .with_label_values(&[kind.as_str()])
        .inc();
}

/// Fold a broadcast report into the delivery counters
pub fn record_broadcast(report: &BroadcastReport) {
    let outcomes = [
        ("delivered", report.delivered),
        ("dropped_oldest", report.dropped_oldest),
        ("disconnected", report.disconnected),
        ("skipped", report.skipped),
    ];
    for (outcome, count) in outcomes {
        if count > 0 {
            BROADCAST_DELIVERIES_TOTAL
                .with_label_values(&[outcome])
                .inc_by(count as u64);
        }
    }
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_metrics() {
        record_message(MessageKind::UserMessage);
        let metrics = gather_metrics();
        assert!(metrics.contains("chat_delivery_messages_posted_total"));
    }

    #[test]
    fn test_record_broadcast_counts_outcomes() {
        let before = BROADCAST_DELIVERIES_TOTAL
            .with_label_values(&["disconnected"])
            .get();

        record_broadcast(&BroadcastReport {
            delivered: 3,
            dropped_oldest: 0,
            disconnected: 2,
            skipped: 0,
        });

        let after = BROADCAST_DELIVERIES_TOTAL
            .with_label_values(&["disconnected"])
            .get();
        assert!(after >= before + 2);
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, 0.001);
        let metrics = gather_metrics();
        assert!(metrics.contains("http_requests_total"));
    }
}
