//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Connector and attempts produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log output (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (endpoint, token, index) on every transition
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
