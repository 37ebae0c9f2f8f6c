//! Typed session events
//!
//! The websocket reader task translates raw frames into these events;
//! the session consumes them from a single queue, which keeps the state
//! machine testable without a live connection.

/// One event on the session queue.
#[derive(Debug)]
pub enum SessionEvent {
    /// Upstream handshake completed.
    Connected,
    /// A text frame arrived from the feed.
    Message(String),
    /// Keepalive ping. Answered at the websocket protocol layer, never
    /// routed to the pipeline.
    Ping(Vec<u8>),
    /// Keepalive pong.
    Pong(Vec<u8>),
    /// Upstream closed the connection, with the error if there was one.
    Disconnected(Option<String>),
}
