//! Notifications from the connector to its owning client.

use std::sync::{Arc, Mutex, PoisonError};

/// Receives lifecycle notifications from a [`Connector`](crate::Connector).
///
/// Callbacks run after the connector has released its lock, on whichever
/// thread performed the operation (or the outcome driver task). They may call
/// back into the connector but should not block.
pub trait ConnectionHandler<T>: Send + Sync + 'static {
    /// Take over a freshly opened transport. Called before `on_connection_success`.
    fn init(&self, transport: Arc<T>);

    fn on_connection_success(&self);

    /// One attempt failed; failover to the next endpoint has already started.
    fn on_connection_failed(&self);

    /// The connector was disconnected (also reported on `reconnect`).
    fn on_closed(&self);

    /// Every endpoint failed in one cycle; queued work for the destination
    /// should be dropped.
    fn clear_unreachable_messages(&self);
}

/// Handler that logs every notification and holds the live transport.
#[derive(Debug)]
pub struct LoggingHandler<T> {
    transport: Mutex<Option<Arc<T>>>,
}

impl<T> LoggingHandler<T> {
    pub fn new() -> Self {
        Self {
            transport: Mutex::new(None),
        }
    }

    /// The transport handed over by the most recent successful attempt.
    pub fn transport(&self) -> Option<Arc<T>> {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T> Default for LoggingHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> ConnectionHandler<T> for LoggingHandler<T> {
    fn init(&self, transport: Arc<T>) {
        *self.transport.lock().unwrap_or_else(PoisonError::into_inner) = Some(transport);
    }

    fn on_connection_success(&self) {
        tracing::info!("Connection established");
    }

    fn on_connection_failed(&self) {
        tracing::warn!("Connection attempt failed");
    }

    fn on_closed(&self) {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        tracing::info!("Connection closed");
    }

    fn clear_unreachable_messages(&self) {
        tracing::warn!("All endpoints unreachable, dropping queued messages");
    }
}
