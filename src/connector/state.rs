//! Connector state machine states.
//!
//! # State Transitions
//! ```text
//! Closed → Connecting: connect / reconnect / check_connect
//! Connecting → Connected: current attempt succeeded
//! Connecting → Failed → Closed → Connecting: current attempt failed, next endpoint
//! Connecting → Closed: disconnect, or endpoint list exhausted
//! Connected → Closed: disconnect / reconnect
//! ```
//!
//! `Failed` only exists inside the failure transition and is never left
//! standing once the connector lock is released.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorState {
    /// No attempt in flight and no live connection.
    Closed = 0,
    /// One attempt in flight.
    Connecting = 1,
    /// Live connection handed to the client.
    Connected = 2,
    /// Current attempt failed; failover is about to run.
    Failed = 3,
}

impl From<u8> for ConnectorState {
    fn from(val: u8) -> Self {
        match val {
            1 => ConnectorState::Connecting,
            2 => ConnectorState::Connected,
            3 => ConnectorState::Failed,
            _ => ConnectorState::Closed,
        }
    }
}

impl fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectorState::Closed => "closed",
            ConnectorState::Connecting => "connecting",
            ConnectorState::Connected => "connected",
            ConnectorState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Lock-free mirror of the connector state for status queries.
///
/// Written only while the connector lock is held.
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn new(state: ConnectorState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> ConnectorState {
        ConnectorState::from(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: ConnectorState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
