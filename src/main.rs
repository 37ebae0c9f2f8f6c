//! Urban Observatory telemetry bridge
//!
//! A best-effort, at-most-once forwarder that:
//! - Holds one persistent websocket session to the sensor feed
//! - Classifies inbound envelopes by their Signal discriminant
//! - Projects data envelopes into canonical records
//! - Publishes records to a NATS JetStream topic, echoing each to stdout
//! - Exposes health/ready endpoints and Prometheus metrics

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

mod broker;
mod config;
mod envelope;
pub mod error;
mod health;
mod metrics;
mod session;

use broker::RecordPublisher;
use config::{BridgeConfig, LogFormat};
use health::AppState;
use metrics::BridgeMetrics;
use session::FeedSession;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first to get log level and format
    let config = BridgeConfig::from_env()?;

    init_tracing(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        feed_url = %config.feed_url,
        topic = %config.broker_topic,
        "Starting telemetry bridge"
    );

    // Initialize metrics
    let metrics = Arc::new(BridgeMetrics::new());
    info!("Prometheus metrics initialized");

    // Broker connectivity is decided once here; failure degrades the
    // bridge to echo-only mode instead of aborting startup.
    let publisher = RecordPublisher::connect(&config.broker_servers, &config.broker_topic).await;
    metrics.set_broker_connected(publisher.is_connected());

    // Upstream connect failure, by contrast, is fatal once the bounded
    // retry budget is spent.
    let session = FeedSession::connect(
        &config.feed_url,
        Arc::clone(&publisher),
        Arc::clone(&metrics),
    )
    .await?;
    let shutdown = session.shutdown_handle();

    // Start health server
    let app_state = AppState {
        session: session.state(),
        publisher: Arc::clone(&publisher),
        metrics: Arc::clone(&metrics),
    };

    let health_router = health::router(app_state);
    let addr: SocketAddr = ([0, 0, 0, 0], config.http_port).into();

    info!(port = config.http_port, "Starting HTTP server");

    let http_server = axum::serve(tokio::net::TcpListener::bind(addr).await?, health_router);

    // Run everything concurrently
    tokio::select! {
        result = session.run() => {
            if let Err(e) = result {
                error!(error = %e, "Session error");
            }
        }
        result = http_server => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Graceful shutdown
    info!("Shutting down bridge...");

    shutdown.trigger();
    publisher.close().await;

    info!("Bridge shutdown complete");
    Ok(())
}

fn init_tracing(config: &BridgeConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("urban_bridge={}", config.log_level).parse()?)
        .add_directive("tokio_tungstenite=info".parse()?)
        .add_directive("async_nats=warn".parse()?);

    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
    }

    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
