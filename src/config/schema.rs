//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the connector.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the failover connector.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Candidate endpoints, tried in order.
    pub endpoints: Vec<EndpointConfig>,

    /// Per-attempt dial settings.
    pub connect: ConnectConfig,

    /// Periodic liveness checks.
    pub keepalive: KeepaliveConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// One candidate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Hostname or IP address.
    pub host: String,

    /// TCP port.
    pub port: u16,
}

/// Dial configuration applied to every attempt.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// Connection establishment timeout in seconds.
    pub timeout_secs: u64,

    /// Set TCP_NODELAY on established sockets.
    pub nodelay: bool,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            nodelay: true,
        }
    }
}

/// Keepalive configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    /// Run periodic `check_connect` calls.
    pub enabled: bool,

    /// Interval between checks while connected or connecting, in seconds.
    pub interval_secs: u64,

    /// Base delay for exponential backoff while the connector stays closed.
    pub backoff_base_ms: u64,

    /// Maximum backoff delay in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
