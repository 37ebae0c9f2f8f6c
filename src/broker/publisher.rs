//! Canonical record publisher
//!
//! Best-effort, at-most-once forwarding to NATS JetStream. Broker
//! connectivity is decided once at startup; when the broker is
//! unreachable the publisher degrades to echo-only mode instead of
//! failing the process, and no reconnection is attempted.

use crate::envelope::CanonicalRecord;
use crate::error::BridgeError;
use async_nats::jetstream::{self, Context as JsContext};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Publisher for canonical records
///
/// Owns its connectivity state: the session asks it to publish and never
/// inspects the broker connection directly.
pub struct RecordPublisher {
    jetstream: Option<JsContext>,
    topic: String,
    connected: AtomicBool,
    echo: Mutex<Box<dyn Write + Send>>,
    messages_published: AtomicU64,
    publish_failures: AtomicU64,
}

impl RecordPublisher {
    /// Connect to the broker, falling back to echo-only mode on failure.
    ///
    /// The connection is attempted exactly once; a publisher that starts
    /// disconnected stays disconnected for the process lifetime.
    pub async fn connect(servers: &str, topic: &str) -> Arc<Self> {
        info!(servers, topic, "Connecting to broker");

        match async_nats::connect(servers).await {
            Ok(client) => {
                let js = jetstream::new(client);
                if let Err(e) = ensure_stream(&js, topic).await {
                    warn!(error = %e, "Broker stream setup failed - running in echo-only mode");
                    return Arc::new(Self::echo_only(topic));
                }

                info!("Connected to broker");
                Arc::new(Self {
                    jetstream: Some(js),
                    topic: topic.to_string(),
                    connected: AtomicBool::new(true),
                    echo: Mutex::new(Box::new(std::io::stdout())),
                    messages_published: AtomicU64::new(0),
                    publish_failures: AtomicU64::new(0),
                })
            }
            Err(e) => {
                let e = BridgeError::BrokerConnectionFailed(Box::new(e));
                warn!(error = %e, "Failed to connect to broker - running in echo-only mode");
                Arc::new(Self::echo_only(topic))
            }
        }
    }

    /// Build a publisher with no broker connection, echoing to stdout.
    pub fn echo_only(topic: &str) -> Self {
        Self::with_sink(topic, Box::new(std::io::stdout()))
    }

    /// Build a disconnected publisher writing its echo output to `sink`.
    pub fn with_sink(topic: &str, sink: Box<dyn Write + Send>) -> Self {
        Self {
            jetstream: None,
            topic: topic.to_string(),
            connected: AtomicBool::new(false),
            echo: Mutex::new(sink),
            messages_published: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Get total records acknowledged by the broker
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    /// Get total publish failures
    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    /// Publish a canonical record, best-effort.
    ///
    /// The serialized record is always written newline-terminated to the
    /// local echo sink; the broker send happens only while connected and
    /// waits for the JetStream acknowledgment before returning.
    pub async fn publish(&self, record: &CanonicalRecord) -> Result<(), BridgeError> {
        let payload = serde_json::to_vec(record).map_err(BridgeError::SerializationFailed)?;

        self.write_echo(&payload);

        let Some(js) = &self.jetstream else {
            return Ok(());
        };
        if !self.is_connected() {
            return Ok(());
        }

        debug!(topic = %self.topic, "Publishing record");

        let ack = async { js.publish(self.topic.clone(), payload.into()).await?.await };
        match ack.await {
            Ok(ack) => {
                self.messages_published.fetch_add(1, Ordering::Relaxed);
                debug!(
                    topic = %self.topic,
                    stream = %ack.stream,
                    seq = ack.sequence,
                    "Record acknowledged"
                );
                Ok(())
            }
            Err(e) => {
                self.publish_failures.fetch_add(1, Ordering::Relaxed);
                Err(BridgeError::PublishFailed {
                    topic: self.topic.clone(),
                    source: Box::new(e),
                })
            }
        }
    }

    // Echo failures are logged and swallowed: a broken pipe on stdout
    // must not take the session down.
    fn write_echo(&self, payload: &[u8]) {
        let result = {
            let mut sink = match self.echo.lock() {
                Ok(sink) => sink,
                Err(poisoned) => poisoned.into_inner(),
            };
            sink.write_all(payload)
                .and_then(|_| sink.write_all(b"\n"))
                .and_then(|_| sink.flush())
        };

        if let Err(e) = result {
            let e = BridgeError::EchoFailed(e);
            warn!(error = %e, "Echo write failed");
        }
    }

    /// Graceful shutdown
    pub async fn close(&self) {
        info!(
            published = self.messages_published(),
            failures = self.publish_failures(),
            "Closing broker connection"
        );
        self.connected.store(false, Ordering::SeqCst);
        // async-nats handles cleanup on drop
    }
}

/// Ensure the JetStream stream backing `topic` exists.
async fn ensure_stream(js: &JsContext, topic: &str) -> Result<(), BridgeError> {
    use async_nats::jetstream::stream::{Config, RetentionPolicy, StorageType};

    let config = Config {
        name: topic.to_uppercase(),
        subjects: vec![topic.to_string()],
        retention: RetentionPolicy::Limits,
        storage: StorageType::File,
        ..Default::default()
    };

    match js.create_stream(config).await {
        Ok(_) => info!(topic, "Created broker stream"),
        Err(e) if e.to_string().contains("already in use") => {
            debug!(topic, "Broker stream already exists");
        }
        Err(e) => {
            error!(topic, error = %e, "Failed to create broker stream");
            return Err(BridgeError::BrokerConnectionFailed(Box::new(e)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn record() -> CanonicalRecord {
        CanonicalRecord {
            building: "USB".to_string(),
            floor: "1".to_string(),
            sensor: "temperature".to_string(),
            value: 21.5,
        }
    }

    #[tokio::test]
    async fn echo_only_publisher_echoes_and_skips_broker() {
        let buf = SharedBuf::default();
        let publisher = RecordPublisher::with_sink("test", Box::new(buf.clone()));

        publisher.publish(&record()).await.unwrap();

        let echoed = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            echoed,
            "{\"Building\":\"USB\",\"Floor\":\"1\",\"Sensor\":\"temperature\",\"Value\":21.5}\n"
        );
        assert!(!publisher.is_connected());
        assert_eq!(publisher.messages_published(), 0);
        assert_eq!(publisher.publish_failures(), 0);
    }

    #[tokio::test]
    async fn echo_output_is_one_line_per_record() {
        let buf = SharedBuf::default();
        let publisher = RecordPublisher::with_sink("test", Box::new(buf.clone()));

        publisher.publish(&record()).await.unwrap();
        publisher.publish(&record()).await.unwrap();

        let echoed = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(echoed.lines().count(), 2);
    }

    #[tokio::test]
    async fn echo_write_failure_does_not_error() {
        struct FailingSink;

        impl Write for FailingSink {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let publisher = RecordPublisher::with_sink("test", Box::new(FailingSink));
        publisher.publish(&record()).await.unwrap();
    }
}
