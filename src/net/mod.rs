//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Connector picks endpoint.rs entry
//!     → attempt.rs (spawned task)
//!     → transport.rs Dialer::dial (TCP connect with timeout)
//!     → AttemptOutcome { token, endpoint, transport | error }
//!
//! Attempt States:
//!     Pending → Resolved → Closed
//!     Pending → Closed
//! ```
//!
//! # Design Decisions
//! - Each attempt runs on its own task, independent of the caller
//! - Socket I/O after connect belongs to the client, not this layer
//! - Closing an attempt is terminal and idempotent

pub mod attempt;
pub mod endpoint;
pub mod transport;

pub use endpoint::{Endpoint, EndpointList, EndpointParseError};
pub use transport::{ConnectError, Dialer, TcpDialer, TcpTransport, Transport};
