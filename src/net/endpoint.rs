//! Candidate server addresses.
//!
//! # Responsibilities
//! - Represent a single (host, port) pair
//! - Parse `host:port` and `[v6]:port` forms from CLI/config input
//! - Render endpoints consistently for logs and metric labels

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EndpointConfig;

/// A candidate server address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Hostname or IP literal (IPv6 without brackets).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Ordered endpoint list shared between the connector and its callers.
pub type EndpointList = Arc<Vec<Endpoint>>;

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Errors produced while parsing an endpoint string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointParseError {
    #[error("missing port in endpoint '{0}'")]
    MissingPort(String),

    #[error("invalid port '{port}' in endpoint '{input}'")]
    InvalidPort { input: String, port: String },

    #[error("empty host in endpoint '{0}'")]
    EmptyHost(String),
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let (host, port) = input
            .rsplit_once(':')
            .ok_or_else(|| EndpointParseError::MissingPort(input.to_string()))?;

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(EndpointParseError::EmptyHost(input.to_string()));
        }
        // A bare IPv6 literal has more colons than the port separator.
        if host.contains(':') && !input.starts_with('[') {
            return Err(EndpointParseError::MissingPort(input.to_string()));
        }

        let port = port.parse::<u16>().map_err(|_| EndpointParseError::InvalidPort {
            input: input.to_string(),
            port: port.to_string(),
        })?;

        Ok(Endpoint::new(host, port))
    }
}

impl From<&EndpointConfig> for Endpoint {
    fn from(config: &EndpointConfig) -> Self {
        Endpoint::new(config.host.clone(), config.port)
    }
}
