//! Failover TCP connection lifecycle controller.
//!
//! Establishes, monitors and re-establishes one logical connection over an
//! ordered list of candidate endpoints, failing over on connect errors and
//! discarding outcomes of superseded attempts.

pub mod config;
pub mod connector;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::ConnectorConfig;
pub use connector::{ConnectToken, ConnectionHandler, Connector, ConnectorSnapshot, ConnectorState};
pub use lifecycle::{Keepalive, Shutdown};
pub use net::{ConnectError, Dialer, Endpoint, TcpDialer, TcpTransport, Transport};
