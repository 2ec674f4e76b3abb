//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Detect duplicate endpoints
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ConnectorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ConnectorConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one endpoint is required")]
    NoEndpoints,

    #[error("endpoint #{index} has an empty host")]
    EmptyHost { index: usize },

    #[error("endpoint #{index} ({host}) has port 0")]
    ZeroPort { index: usize, host: String },

    #[error("endpoint {0} is listed more than once")]
    DuplicateEndpoint(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("keepalive.backoff_base_ms ({base}) exceeds keepalive.backoff_max_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Where the connector's endpoint list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointSource {
    /// The `endpoints` list of the config file.
    #[default]
    ConfigFile,
    /// Given on the command line; the file may leave `endpoints` out.
    CommandLine,
}

/// Check a parsed configuration, collecting every violation.
pub fn validate_config(config: &ConnectorConfig) -> Result<(), Vec<ValidationError>> {
    validate_config_for(config, EndpointSource::ConfigFile)
}

/// Like [`validate_config`], but only requires endpoints when the file is
/// their source.
pub fn validate_config_for(config: &ConnectorConfig, source: EndpointSource) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if source == EndpointSource::ConfigFile && config.endpoints.is_empty() {
        errors.push(ValidationError::NoEndpoints);
    }

    let mut seen = HashSet::new();
    for (index, endpoint) in config.endpoints.iter().enumerate() {
        if endpoint.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost { index });
        }
        if endpoint.port == 0 {
            errors.push(ValidationError::ZeroPort {
                index,
                host: endpoint.host.clone(),
            });
        }
        if !seen.insert((endpoint.host.as_str(), endpoint.port)) {
            errors.push(ValidationError::DuplicateEndpoint(format!(
                "{}:{}",
                endpoint.host, endpoint.port
            )));
        }
    }

    if config.connect.timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration("connect.timeout_secs"));
    }

    let keepalive = &config.keepalive;
    if keepalive.enabled {
        if keepalive.interval_secs == 0 {
            errors.push(ValidationError::ZeroDuration("keepalive.interval_secs"));
        }
        if keepalive.backoff_base_ms > keepalive.backoff_max_ms {
            errors.push(ValidationError::BackoffRange {
                base: keepalive.backoff_base_ms,
                max: keepalive.backoff_max_ms,
            });
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
