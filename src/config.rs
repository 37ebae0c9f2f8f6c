//! Bridge configuration module
//!
//! Handles loading configuration from environment variables.

use crate::error::BridgeError;
use std::env;

/// Upstream feed endpoint used when FEED_URL is not set.
pub const DEFAULT_FEED_URL: &str = "wss://api.usb.urbanobservatory.ac.uk/stream";

/// Output format for process logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text output
    Text,
    /// Structured JSON output for log aggregation systems
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, BridgeError> {
        match value {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(BridgeError::Config(format!(
                "LOG_FORMAT must be 'text' or 'json', got '{other}'"
            ))),
        }
    }
}

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Broker bootstrap address(es), comma-separated
    pub broker_servers: String,

    /// Broker topic canonical records are published to
    pub broker_topic: String,

    /// Upstream websocket feed endpoint
    pub feed_url: String,

    /// Health/metrics HTTP port
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,
}

impl BridgeConfig {
    /// Load configuration from environment variables
    ///
    /// The documented variables (BROKER_BOOTSTRAP_SERVERS, BROKER_TOPIC,
    /// LOG_LEVEL, LOG_FORMAT) are case-folded to lowercase; FEED_URL and
    /// HTTP_PORT are taken as-is.
    pub fn from_env() -> Result<Self, BridgeError> {
        dotenvy::dotenv().ok();

        let broker_servers = env::var("BROKER_BOOTSTRAP_SERVERS")
            .unwrap_or_else(|_| "localhost:9092".to_string())
            .to_lowercase();

        let broker_topic = env::var("BROKER_TOPIC")
            .unwrap_or_else(|_| "test".to_string())
            .to_lowercase();

        let log_level = env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string())
            .to_lowercase();

        let log_format = LogFormat::parse(
            &env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "text".to_string())
                .to_lowercase(),
        )?;

        let feed_url = env::var("FEED_URL").unwrap_or_else(|_| DEFAULT_FEED_URL.to_string());

        let http_port = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "9090".to_string())
            .parse()
            .map_err(|e| BridgeError::Config(format!("HTTP_PORT must be a valid port number: {e}")))?;

        Ok(Self {
            broker_servers,
            broker_topic,
            feed_url,
            http_port,
            log_level,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_known_values() {
        assert_eq!(LogFormat::parse("text").unwrap(), LogFormat::Text);
        assert_eq!(LogFormat::parse("json").unwrap(), LogFormat::Json);
        assert!(LogFormat::parse("yaml").is_err());
    }

    // Environment mutation is process-global, so defaults and folding are
    // exercised in one sequential test.
    #[test]
    fn from_env_defaults_and_case_folding() {
        for key in [
            "BROKER_BOOTSTRAP_SERVERS",
            "BROKER_TOPIC",
            "LOG_LEVEL",
            "LOG_FORMAT",
            "FEED_URL",
            "HTTP_PORT",
        ] {
            env::remove_var(key);
        }

        let config = BridgeConfig::from_env().unwrap();
        assert_eq!(config.broker_servers, "localhost:9092");
        assert_eq!(config.broker_topic, "test");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.http_port, 9090);

        env::set_var("BROKER_TOPIC", "SENSORS");
        env::set_var("LOG_FORMAT", "JSON");
        let config = BridgeConfig::from_env().unwrap();
        assert_eq!(config.broker_topic, "sensors");
        assert_eq!(config.log_format, LogFormat::Json);

        env::set_var("HTTP_PORT", "not-a-port");
        assert!(BridgeConfig::from_env().is_err());

        env::remove_var("BROKER_TOPIC");
        env::remove_var("LOG_FORMAT");
        env::remove_var("HTTP_PORT");
    }
}
