//! Session state tracking
//!
//! Shared snapshot of the single upstream session, read by the health
//! endpoints while the session loop writes to it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Health status for the upstream session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionHealth {
    /// Handshake with the upstream feed is in progress
    Connecting,
    /// Session is connected and dispatching inbound messages
    Connected,
    /// Upstream closed the connection; the session is idle
    Disconnected,
    /// Shutdown was requested and the session loop has stopped
    ShuttingDown,
}

impl SessionHealth {
    /// Returns true if the session is receiving events
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionHealth::Connected)
    }

    /// Label used in readiness payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionHealth::Connecting => "connecting",
            SessionHealth::Connected => "connected",
            SessionHealth::Disconnected => "disconnected",
            SessionHealth::ShuttingDown => "shutting_down",
        }
    }
}

/// Shared state for the feed session
#[derive(Debug, Clone)]
pub struct SessionState {
    inner: Arc<SessionStateInner>,
}

#[derive(Debug)]
struct SessionStateInner {
    health: RwLock<SessionHealth>,
    connected_at: RwLock<Option<Instant>>,
    messages_received: AtomicU64,
    records_forwarded: AtomicU64,
    forward_failures: AtomicU64,
    no_data_envelopes: AtomicU64,
    unparseable_frames: AtomicU64,
}

impl SessionState {
    /// Create a new session state tracker
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStateInner {
                health: RwLock::new(SessionHealth::Disconnected),
                connected_at: RwLock::new(None),
                messages_received: AtomicU64::new(0),
                records_forwarded: AtomicU64::new(0),
                forward_failures: AtomicU64::new(0),
                no_data_envelopes: AtomicU64::new(0),
                unparseable_frames: AtomicU64::new(0),
            }),
        }
    }

    /// Update session health
    pub fn set_health(&self, health: SessionHealth) {
        let mut guard = match self.inner.health.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = health;

        if health == SessionHealth::Connected {
            let mut connected_at = match self.inner.connected_at.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if connected_at.is_none() {
                *connected_at = Some(Instant::now());
            }
        }
    }

    /// Get current session health
    pub fn health(&self) -> SessionHealth {
        match self.inner.health.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Returns true if the session is connected
    pub fn is_connected(&self) -> bool {
        self.health().is_connected()
    }

    /// Time since the session first connected, if it ever did
    pub fn uptime(&self) -> Option<Duration> {
        let connected_at = match self.inner.connected_at.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        connected_at.map(|at| at.elapsed())
    }

    /// Increment inbound message counter
    pub fn record_message(&self) {
        self.inner.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment forwarded record counter
    pub fn record_forward(&self) {
        self.inner.records_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment forward failure counter
    pub fn record_forward_failure(&self) {
        self.inner.forward_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment no-data envelope counter
    pub fn record_no_data(&self) {
        self.inner.no_data_envelopes.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment unparseable frame counter
    pub fn record_unparseable(&self) {
        self.inner.unparseable_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Total inbound messages
    pub fn messages_received(&self) -> u64 {
        self.inner.messages_received.load(Ordering::Relaxed)
    }

    /// Total records that completed the pipeline
    pub fn records_forwarded(&self) -> u64 {
        self.inner.records_forwarded.load(Ordering::Relaxed)
    }

    /// Total records dropped on a pipeline failure
    pub fn forward_failures(&self) -> u64 {
        self.inner.forward_failures.load(Ordering::Relaxed)
    }

    /// Total envelopes carrying no data payload
    pub fn no_data_envelopes(&self) -> u64 {
        self.inner.no_data_envelopes.load(Ordering::Relaxed)
    }

    /// Total frames that were not valid JSON
    pub fn unparseable_frames(&self) -> u64 {
        self.inner.unparseable_frames.load(Ordering::Relaxed)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected_with_zero_counters() {
        let state = SessionState::new();
        assert_eq!(state.health(), SessionHealth::Disconnected);
        assert!(!state.is_connected());
        assert!(state.uptime().is_none());
        assert_eq!(state.messages_received(), 0);
        assert_eq!(state.records_forwarded(), 0);
    }

    #[test]
    fn health_transitions_are_visible_to_clones() {
        let state = SessionState::new();
        let view = state.clone();

        state.set_health(SessionHealth::Connecting);
        assert_eq!(view.health(), SessionHealth::Connecting);

        state.set_health(SessionHealth::Connected);
        assert!(view.is_connected());
        assert!(view.uptime().is_some());

        state.set_health(SessionHealth::Disconnected);
        assert!(!view.is_connected());
        // First-connect time survives a disconnect
        assert!(view.uptime().is_some());
    }

    #[test]
    fn counters_accumulate() {
        let state = SessionState::new();
        state.record_message();
        state.record_message();
        state.record_forward();
        state.record_forward_failure();
        state.record_no_data();
        state.record_unparseable();

        assert_eq!(state.messages_received(), 2);
        assert_eq!(state.records_forwarded(), 1);
        assert_eq!(state.forward_failures(), 1);
        assert_eq!(state.no_data_envelopes(), 1);
        assert_eq!(state.unparseable_frames(), 1);
    }

    #[test]
    fn health_labels_are_distinct() {
        let labels = [
            SessionHealth::Connecting.as_str(),
            SessionHealth::Connected.as_str(),
            SessionHealth::Disconnected.as_str(),
            SessionHealth::ShuttingDown.as_str(),
        ];
        let mut unique = labels.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(labels.len(), unique.len());
    }
}
