//! A single asynchronous connection attempt.
//!
//! # Responsibilities
//! - Dial one endpoint on its own task
//! - Report exactly one outcome, tagged with the attempt's token
//! - Support forced termination that suppresses a not-yet-reported outcome
//!
//! # States
//! ```text
//! Pending → Resolved(transport?)   dial finished first, outcome sent
//! Pending → Closed                 close() won, outcome suppressed
//! Resolved → Closed                close() after the outcome, transport closed
//! ```
//!
//! An attempt never leaves `Closed` and is never reused for another token.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::connector::token::ConnectToken;
use crate::net::endpoint::Endpoint;
use crate::net::transport::{ConnectError, Dialer, Transport};

/// The single result reported by an attempt.
#[derive(Debug)]
pub struct AttemptOutcome<T> {
    pub token: ConnectToken,
    pub endpoint: Endpoint,
    pub result: Result<Arc<T>, ConnectError>,
}

/// What `close()` found when it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The dial had not finished; no outcome will ever be delivered.
    Suppressed,
    /// An outcome was already sent; any transport it carried is now closed.
    AlreadyResolved,
    /// The attempt was closed earlier.
    AlreadyClosed,
}

#[derive(Debug)]
enum Slot<T> {
    Pending,
    Resolved(Option<Arc<T>>),
    Closed,
}

/// One in-flight or settled attempt to reach an endpoint.
#[derive(Debug)]
pub struct ConnectionAttempt<T> {
    token: ConnectToken,
    endpoint: Endpoint,
    slot: Arc<Mutex<Slot<T>>>,
    task: JoinHandle<()>,
}

fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Transport> ConnectionAttempt<T> {
    /// Start dialing `endpoint` on `runtime`. The outcome is sent on `outcomes`.
    pub fn start<D>(
        token: ConnectToken,
        endpoint: Endpoint,
        dialer: &D,
        outcomes: mpsc::UnboundedSender<AttemptOutcome<T>>,
        runtime: &Handle,
    ) -> Self
    where
        D: Dialer<Transport = T>,
    {
        let slot = Arc::new(Mutex::new(Slot::Pending));
        let dial = dialer.dial(&endpoint);

        let task_slot = Arc::clone(&slot);
        let task_endpoint = endpoint.clone();
        let task = runtime.spawn(async move {
            let result = dial.await.map(Arc::new);

            {
                let mut slot = lock(&task_slot);
                if !matches!(*slot, Slot::Pending) {
                    drop(slot);
                    if let Ok(transport) = result {
                        transport.close();
                    }
                    tracing::trace!(token = %token, "Attempt closed before resolving, outcome dropped");
                    return;
                }
                *slot = Slot::Resolved(result.as_ref().ok().cloned());
            }

            let outcome = AttemptOutcome {
                token,
                endpoint: task_endpoint,
                result,
            };
            if let Err(mpsc::error::SendError(outcome)) = outcomes.send(outcome) {
                // Connector is gone; nobody will take ownership of the transport.
                if let Ok(transport) = outcome.result {
                    transport.close();
                }
            }
        });

        tracing::debug!(token = %token, endpoint = %endpoint, "Connection attempt started");

        Self {
            token,
            endpoint,
            slot,
            task,
        }
    }

    pub fn token(&self) -> ConnectToken {
        self.token
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// True once the dial has produced an outcome.
    pub fn is_resolved(&self) -> bool {
        matches!(*lock(&self.slot), Slot::Resolved(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(*lock(&self.slot), Slot::Closed)
    }

    /// Forward a wake-up to the established transport, if any.
    pub fn wake_up(&self) {
        if let Slot::Resolved(Some(transport)) = &*lock(&self.slot) {
            transport.wake_up();
        }
    }

    /// Terminate the attempt. Idempotent.
    pub fn close(&self) -> CloseOutcome {
        let previous = std::mem::replace(&mut *lock(&self.slot), Slot::Closed);
        match previous {
            Slot::Pending => {
                self.task.abort();
                tracing::debug!(token = %self.token, endpoint = %self.endpoint, "Pending attempt cancelled");
                CloseOutcome::Suppressed
            }
            Slot::Resolved(transport) => {
                if let Some(transport) = transport {
                    transport.close();
                }
                CloseOutcome::AlreadyResolved
            }
            Slot::Closed => CloseOutcome::AlreadyClosed,
        }
    }
}
