//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Keepalive finds the connector closed after a failed cycle:
//!     → backoff.rs (jittered exponential delay before the next check)
//! ```
//!
//! # Design Decisions
//! - Per-attempt deadlines live in the dialer (connect timeout)
//! - The connector itself never sleeps; pacing is the keepalive's job
//! - Jitter prevents many clients from re-dialing in lockstep

pub mod backoff;
