//! Connection lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! Client command (connect / reconnect / disconnect / check_connect)
//!     → controller.rs (lock, transition, mint token)
//!     → net::attempt (dial endpoint on its own task)
//!     → AttemptOutcome over mpsc
//!     → controller.rs outcome driver
//!         token current → Connected, or failover to next endpoint
//!         token stale   → registry.rs lookup, close, drop
//!     → handler.rs notifications to the client
//! ```
//!
//! # Design Decisions
//! - One lock guards state, index, token and registry
//! - Outcomes are values keyed by token, not callbacks capturing connector state
//! - Failover is a transition that starts the next attempt, never a recursive call
//! - Operations that do not match the current state are no-ops, not errors

pub mod controller;
pub mod handler;
pub(crate) mod registry;
pub mod state;
pub mod token;

pub use controller::{Connector, ConnectorSnapshot};
pub use handler::{ConnectionHandler, LoggingHandler};
pub use state::ConnectorState;
pub use token::ConnectToken;
