//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Keepalive (keepalive.rs):
//!     Timer → Connector::check_connect → next delay (interval or backoff)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → keepalive exits → Connector::disconnect
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Liveness is driven from outside the connector, by periodic checks
//! - Shutdown disconnects explicitly so the client sees `on_closed`

pub mod keepalive;
pub mod shutdown;
pub mod signals;

pub use keepalive::Keepalive;
pub use shutdown::Shutdown;
