//! Prometheus metrics module

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;

/// Bridge metrics collector
#[derive(Clone)]
pub struct BridgeMetrics {
    handle: Option<Arc<PrometheusHandle>>,
}

impl BridgeMetrics {
    /// Initialize metrics and return handle
    pub fn new() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        Self::register_metrics();

        Self {
            handle: Some(Arc::new(handle)),
        }
    }

    /// Metrics sink with no recorder behind it; every record call is a
    /// no-op. Used by session tests.
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions
    fn register_metrics() {
        describe_counter!(
            "bridge_messages_received_total",
            Unit::Count,
            "Total messages received from the upstream feed"
        );
        describe_counter!(
            "bridge_records_forwarded_total",
            Unit::Count,
            "Total canonical records forwarded downstream"
        );
        describe_counter!(
            "bridge_forward_failures_total",
            Unit::Count,
            "Records dropped on a failed broker publish"
        );
        describe_counter!(
            "bridge_errors_total",
            Unit::Count,
            "Total bridge errors by type"
        );

        describe_histogram!(
            "bridge_forward_duration_seconds",
            Unit::Seconds,
            "Time to publish a record to the broker"
        );

        describe_gauge!(
            "bridge_session_up",
            Unit::Count,
            "Upstream session status (1=connected, 0=not connected)"
        );
        describe_gauge!(
            "bridge_broker_connected",
            Unit::Count,
            "Broker connection status (1=connected, 0=echo-only)"
        );
        describe_gauge!(
            "bridge_last_heartbeat_timestamp",
            Unit::Count,
            "Unix timestamp of the last upstream ping/pong"
        );
    }

    /// Record an inbound message by classification kind
    pub fn record_message(&self, kind: &'static str) {
        counter!("bridge_messages_received_total", "kind" => kind).increment(1);
    }

    /// Record a successfully forwarded record
    pub fn record_forward(&self, duration: Duration) {
        counter!("bridge_records_forwarded_total").increment(1);
        histogram!("bridge_forward_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a failed forward
    pub fn record_forward_failure(&self) {
        counter!("bridge_forward_failures_total").increment(1);
    }

    /// Record a bridge error
    pub fn record_error(&self, error_type: &'static str) {
        counter!("bridge_errors_total", "error_type" => error_type).increment(1);
    }

    /// Record an upstream keepalive
    pub fn record_heartbeat(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        gauge!("bridge_last_heartbeat_timestamp").set(now);
    }

    /// Set upstream session status
    pub fn set_session_up(&self, up: bool) {
        gauge!("bridge_session_up").set(if up { 1.0 } else { 0.0 });
    }

    /// Set broker connection status
    pub fn set_broker_connected(&self, connected: bool) {
        gauge!("bridge_broker_connected").set(if connected { 1.0 } else { 0.0 });
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle
            .as_ref()
            .map(|handle| handle.render())
            .unwrap_or_default()
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
