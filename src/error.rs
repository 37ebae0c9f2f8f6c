//! Domain error types for the telemetry bridge
//!
//! Structured thiserror types for navigable diagnostics and
//! compile-time exhaustive handling.
//!
//! main.rs is the ONLY module allowed to use anyhow::Result (process
//! boundary). All application code returns Result<T, BridgeError>.

use thiserror::Error;

/// Bridge domain errors
///
/// Every variant carries structured context fields for diagnostics.
/// Message-level variants (extraction, serialization, publish, echo) are
/// always logged and dropped by the session; only upstream-connection
/// failure is allowed to terminate the process.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Upstream handshake failed and the bounded retry budget is spent
    #[error("upstream connect failed after {attempts} attempts")]
    UpstreamConnectFailed {
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Broker connection could not be established at startup
    #[error("broker connection failed")]
    BrokerConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Broker publish was not acknowledged for the configured topic
    #[error("broker publish failed for topic '{topic}'")]
    PublishFailed {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Canonical record could not be serialized
    #[error("record serialization failed")]
    SerializationFailed(#[source] serde_json::Error),

    /// Data envelope failed the full second-pass decode
    #[error("data envelope extraction failed")]
    ExtractionFailed(#[source] serde_json::Error),

    /// Local echo sink rejected a write
    #[error("echo sink write failed")]
    EchoFailed(#[source] std::io::Error),

    /// Configuration error (environment variable missing or invalid)
    #[error("configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Returns a static label string suitable for Prometheus metrics.
    ///
    /// Used as the `error_type` label on the `bridge_errors_total`
    /// counter, enabling per-error-type monitoring and alerting.
    pub fn error_type_label(&self) -> &'static str {
        match self {
            Self::UpstreamConnectFailed { .. } => "upstream_connect",
            Self::BrokerConnectionFailed(_) => "broker_connection",
            Self::PublishFailed { .. } => "broker_publish",
            Self::SerializationFailed(_) => "serialization",
            Self::ExtractionFailed(_) => "extraction",
            Self::EchoFailed(_) => "echo",
            Self::Config(_) => "config",
        }
    }
}
