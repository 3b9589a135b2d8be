//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Active WebSocket connections
//! - Messages persisted and bus publish failures
//! - Fan-out outcomes (delivered, offline, queue full)
//! - Malformed inbound frames

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

const NAMESPACE: &str = "chat_delivery";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
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

/// Registered WebSocket connections
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "websocket_connections_active",
            "Number of registered WebSocket connections",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Messages durably stored
pub static MESSAGES_PERSISTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("messages_persisted_total", "Total number of messages stored")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create MESSAGES_PERSISTED_TOTAL metric")
});

/// Publishes that did not reach the broker
pub static BUS_PUBLISH_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "bus_publish_failures_total",
            "Total number of chat events that failed to publish",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create BUS_PUBLISH_FAILURES_TOTAL metric")
});

/// Outcome of delivering a bus event to a local connection
pub static FANOUT_DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fanout_deliveries_total",
            "Chat events handed to local connections by outcome",
        )
        .namespace(NAMESPACE),
        &["outcome"], // "delivered", "offline", "queue_full"
    )
    .expect("Failed to create FANOUT_DELIVERIES_TOTAL metric")
});

/// Inbound frames that could not be parsed
pub static MALFORMED_FRAMES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "malformed_frames_total",
            "Total number of inbound WebSocket frames that failed to parse",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create MALFORMED_FRAMES_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()),
        Box::new(MESSAGES_PERSISTED_TOTAL.clone()),
        Box::new(BUS_PUBLISH_FAILURES_TOTAL.clone()),
        Box::new(FANOUT_DELIVERIES_TOTAL.clone()),
        Box::new(MALFORMED_FRAMES_TOTAL.clone()),
    ];
    for collector in collectors {
        if let Err(err) = registry.register(collector) {
            tracing::error!(error = %err, "Failed to register metric");
        }
    }
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %err, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn set_websocket_connections(active: usize) {
    WEBSOCKET_CONNECTIONS_ACTIVE.set(active as i64);
}

pub fn record_message_persisted() {
    MESSAGES_PERSISTED_TOTAL.inc();
}

pub fn record_bus_publish_failure() {
    BUS_PUBLISH_FAILURES_TOTAL.inc();
}

/// Fan-out outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutOutcome {
    Delivered,
    Offline,
    QueueFull,
}

impl FanoutOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Offline => "offline",
            Self::QueueFull => "queue_full",
        }
    }
}

pub fn record_fanout(outcome: FanoutOutcome) {
    FANOUT_DELIVERIES_TOTAL
        .with_label_values(&[outcome.as_str()])
        .inc();
}

pub fn record_malformed_frame() {
    MALFORMED_FRAMES_TOTAL.inc();
}
