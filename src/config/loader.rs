//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ManagerConfig;
use crate::config::validation::{validate_config, ValidationError};

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

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<ManagerConfig, ConfigError> {
    let config: ManagerConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ManagerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "resilient-clients-{}.toml",
            uuid::Uuid::new_v4()
        ));
        fs::write(
            &path,
            r#"
            region = "eu-west-1"

            [pool]
            max_connections = 4

            [[services]]
            name = "object-store"
            enabled = true
            endpoint = "http://127.0.0.1:9000"
            failure_threshold = 3
            recovery_timeout_secs = 30
            region = "us-east-1"

            [services.retry]
            max_retries = 2
            base_delay_ms = 500
            backoff_factor = 2.0
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        fs::remove_file(&path).unwrap_or_default();

        assert_eq!(config.pool.max_connections, 4);
        let svc = &config.services[0];
        assert_eq!(svc.region_or(&config.region), "us-east-1");
        assert_eq!(svc.retry.as_ref().unwrap().max_retries, 2);
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = parse_config(
            r#"
            [pool]
            max_connections = 0
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Validation(ref v) if v.len() == 1));
        assert!(err.to_string().contains("max_connections"));
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = parse_config(include_str!("../../manager.example.toml")).unwrap();
        assert_eq!(config.services.len(), 4);
        assert_eq!(config.services[0].params["model_id"], "text-large-v2");
        assert_eq!(config.services[3].kind, crate::config::ServiceKind::Custom);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("services = 7").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
