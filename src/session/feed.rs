//! Feed session implementation
//!
//! Owns the upstream websocket connection and drives the
//! classify → extract → publish pipeline for every inbound frame.

use crate::broker::RecordPublisher;
use crate::envelope::{classify, extract, Classification};
use crate::error::BridgeError;
use crate::metrics::BridgeMetrics;
use crate::session::event::SessionEvent;
use crate::session::state::{SessionHealth, SessionState};

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Upstream connect retry policy: exponential backoff, bounded attempts.
/// Exhausting the budget is fatal for the process.
const MAX_CONNECT_ATTEMPTS: u32 = 10;
const BACKOFF_INITIAL: Duration = Duration::from_millis(500);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Frames buffered between the reader task and the consumer loop.
const EVENT_QUEUE_DEPTH: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handle for requesting session shutdown from outside the event loop.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    /// Ask the session and its reader task to stop. The reader closes
    /// the upstream connection with a Close frame.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

/// Upstream feed session
///
/// One session per process: a reader task owns the websocket and feeds
/// the event queue; `run` consumes the queue until shutdown.
pub struct FeedSession {
    events: mpsc::Receiver<SessionEvent>,
    publisher: Arc<RecordPublisher>,
    state: SessionState,
    metrics: Arc<BridgeMetrics>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl FeedSession {
    /// Connect to the upstream feed and spawn the reader task.
    pub async fn connect(
        url: &str,
        publisher: Arc<RecordPublisher>,
        metrics: Arc<BridgeMetrics>,
    ) -> Result<Self, BridgeError> {
        let state = SessionState::new();
        state.set_health(SessionHealth::Connecting);
        info!(url, "Connecting to upstream feed");

        let stream = connect_with_backoff(url).await?;

        let (events_tx, events) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tokio::spawn(read_frames(stream, events_tx, shutdown_tx.subscribe()));

        Ok(Self {
            events,
            publisher,
            state,
            metrics,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Get shared state (for health checks)
    pub fn state(&self) -> SessionState {
        self.state.clone()
    }

    /// Get a shutdown handle usable after the session moves into `run`
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Consume session events until shutdown is requested.
    ///
    /// When the upstream closes, the session stays idle (no automatic
    /// reconnect) and keeps serving health checks until shutdown.
    pub async fn run(mut self) -> Result<(), BridgeError> {
        loop {
            let next = tokio::select! {
                event = self.events.recv() => event,
                _ = self.shutdown_rx.recv() => break,
            };

            match next {
                Some(event) => self.handle_event(event).await,
                None => {
                    // Reader task ended: the upstream is gone for good.
                    let _ = self.shutdown_rx.recv().await;
                    break;
                }
            }
        }

        self.state.set_health(SessionHealth::ShuttingDown);
        self.metrics.set_session_up(false);
        info!(
            messages = self.state.messages_received(),
            forwarded = self.state.records_forwarded(),
            "Session stopped"
        );
        Ok(())
    }

    async fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Connected => {
                self.state.set_health(SessionHealth::Connected);
                self.metrics.set_session_up(true);
                info!("Connected to upstream feed");
            }
            SessionEvent::Message(body) => {
                self.state.record_message();
                self.handle_message(&body).await;
            }
            SessionEvent::Ping(payload) => {
                self.metrics.record_heartbeat();
                debug!(bytes = payload.len(), "Received ping");
            }
            SessionEvent::Pong(payload) => {
                self.metrics.record_heartbeat();
                debug!(bytes = payload.len(), "Received pong");
            }
            SessionEvent::Disconnected(reason) => {
                self.state.set_health(SessionHealth::Disconnected);
                self.metrics.set_session_up(false);
                match reason {
                    Some(reason) => warn!(reason = %reason, "Disconnected from upstream feed"),
                    None => info!("Disconnected from upstream feed"),
                }
            }
        }
    }

    /// Route one inbound frame through classify → extract → publish.
    ///
    /// Every failure here is logged and dropped; nothing message-level
    /// is allowed to end the session.
    async fn handle_message(&self, body: &str) {
        match classify(body) {
            Classification::DataPresent => {
                self.metrics.record_message("data");

                let record = match extract(body) {
                    Ok(record) => record,
                    Err(e) => {
                        self.state.record_forward_failure();
                        self.metrics.record_error(e.error_type_label());
                        warn!(error = %e, "Dropping undecodable data envelope");
                        return;
                    }
                };

                let start = Instant::now();
                match self.publisher.publish(&record).await {
                    Ok(()) => {
                        self.state.record_forward();
                        self.metrics.record_forward(start.elapsed());
                    }
                    Err(e) => {
                        self.state.record_forward_failure();
                        self.metrics.record_error(e.error_type_label());
                        self.metrics.record_forward_failure();
                        warn!(error = %e, "Dropping unpublished record");
                    }
                }
            }
            Classification::NoData(signal) => {
                self.state.record_no_data();
                self.metrics.record_message("no_data");
                info!(signal, "Envelope carries no data payload");
            }
            Classification::Unparseable => {
                self.state.record_unparseable();
                self.metrics.record_message("unparseable");
                warn!("Dropping unparseable frame");
            }
        }
    }

    #[cfg(test)]
    fn with_queue(events: mpsc::Receiver<SessionEvent>, publisher: Arc<RecordPublisher>) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        Self {
            events,
            publisher,
            state: SessionState::new(),
            metrics: Arc::new(BridgeMetrics::disabled()),
            shutdown_tx,
            shutdown_rx,
        }
    }
}

/// Establish the upstream websocket connection with bounded backoff.
async fn connect_with_backoff(url: &str) -> Result<WsStream, BridgeError> {
    let mut backoff = BACKOFF_INITIAL;
    let mut attempt = 0;

    loop {
        attempt += 1;

        match connect_async(url).await {
            Ok((stream, _)) => {
                info!(attempt, "Upstream handshake complete");
                return Ok(stream);
            }
            Err(e) => {
                if attempt >= MAX_CONNECT_ATTEMPTS {
                    return Err(BridgeError::UpstreamConnectFailed {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }

                warn!(
                    attempt,
                    max = MAX_CONNECT_ATTEMPTS,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Upstream connect failed, retrying"
                );
                time::sleep(backoff).await;
                backoff = (backoff * 2).min(BACKOFF_MAX);
            }
        }
    }
}

/// Reader task: owns the websocket, translates frames into session
/// events, and closes the connection when shutdown is requested.
async fn read_frames(
    stream: WsStream,
    events: mpsc::Sender<SessionEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (mut sink, mut frames) = stream.split();

    let _ = events.send(SessionEvent::Connected).await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Closing upstream connection");
                let _ = sink.send(Message::Close(None)).await;
                return;
            }
            frame = frames.next() => match frame {
                None => {
                    let _ = events.send(SessionEvent::Disconnected(None)).await;
                    return;
                }
                Some(Err(e)) => {
                    let _ = events
                        .send(SessionEvent::Disconnected(Some(e.to_string())))
                        .await;
                    return;
                }
                Some(Ok(Message::Text(text))) => {
                    if events.send(SessionEvent::Message(text)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = events.send(SessionEvent::Ping(payload)).await;
                }
                Some(Ok(Message::Pong(payload))) => {
                    let _ = events.send(SessionEvent::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) => {
                    let _ = events.send(SessionEvent::Disconnected(None)).await;
                    return;
                }
                // The feed is text-framed; anything else is ignored
                Some(Ok(_)) => {}
            }
        }
    }
}
