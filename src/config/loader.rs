//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ConnectorConfig;
use crate::config::validation::{validate_config_for, EndpointSource, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ConnectorConfig, ConfigError> {
    parse_config_for(content, EndpointSource::ConfigFile)
}

pub fn parse_config_for(content: &str, source: EndpointSource) -> Result<ConnectorConfig, ConfigError> {
    let config: ConnectorConfig = toml::from_str(content)?;
    validate_config_for(&config, source).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ConnectorConfig, ConfigError> {
    load_config_for(path, EndpointSource::ConfigFile)
}

/// Load a config file whose endpoint list may come from elsewhere.
pub fn load_config_for(path: &Path, source: EndpointSource) -> Result<ConnectorConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config_for(&content, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("failover-connector-{}.toml", std::process::id()));
        fs::write(
            &path,
            "endpoints = [{ host = \"127.0.0.1\", port = 7000 }]\n[connect]\ntimeout_secs = 3\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.endpoints[0].port, 7000);
        assert_eq!(config.connect.timeout_secs, 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/failover-connector.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn parse_error() {
        let err = parse_config("endpoints = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn endpoints_optional_when_given_on_command_line() {
        let content = "[connect]\ntimeout_secs = 3\n";

        let err = parse_config(content).unwrap_err();
        assert!(err.to_string().contains("at least one endpoint"));

        let config = parse_config_for(content, EndpointSource::CommandLine).unwrap();
        assert!(config.endpoints.is_empty());
        assert_eq!(config.connect.timeout_secs, 3);
    }

    #[test]
    fn validation_error_lists_problems() {
        let err = parse_config("endpoints = [{ host = \"\", port = 0 }]").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("empty host"));
        assert!(message.contains("port 0"));
    }
}
