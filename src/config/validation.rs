use super::models::{Config, SourceProvider};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duration must be positive: {field}")]
    ZeroDuration { field: &'static str },

    #[error("Source provider is buildkite but endpoint is empty")]
    EmptyEndpoint,

    #[error("max_log_bytes must be positive")]
    InvalidMaxLogBytes,

    #[error("max_payload_bytes must be positive")]
    InvalidMaxPayloadBytes,

    #[error("max_concurrent_requests must be positive")]
    InvalidConcurrency,

    #[error("temp_prefix '{0}' must be non-empty and contain no path separators")]
    InvalidTempPrefix(String),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_cache(config)?;
    validate_source(config)?;
    validate_delivery(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.request_timeout.as_duration().is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "server.request_timeout",
        });
    }
    if config.server.max_payload_bytes.as_u64() == 0 {
        return Err(ValidationError::InvalidMaxPayloadBytes);
    }
    if config.server.max_concurrent_requests == 0 {
        return Err(ValidationError::InvalidConcurrency);
    }
    Ok(())
}

fn validate_cache(config: &Config) -> Result<(), ValidationError> {
    if config.cache.default_ttl.as_duration().is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "cache.default_ttl",
        });
    }
    if config.cache.retention.as_duration().is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "cache.retention",
        });
    }
    Ok(())
}

fn validate_source(config: &Config) -> Result<(), ValidationError> {
    if config.source.provider == SourceProvider::Buildkite && config.source.endpoint.trim().is_empty() {
        return Err(ValidationError::EmptyEndpoint);
    }
    if config.source.max_log_bytes.as_u64() == 0 {
        return Err(ValidationError::InvalidMaxLogBytes);
    }
    for (field, duration) in [
        ("source.connect_timeout", config.source.connect_timeout),
        ("source.request_timeout", config.source.request_timeout),
    ] {
        if duration.as_duration().is_zero() {
            return Err(ValidationError::ZeroDuration { field });
        }
    }
    Ok(())
}

fn validate_delivery(config: &Config) -> Result<(), ValidationError> {
    let prefix = &config.delivery.temp_prefix;
    if prefix.is_empty() || prefix.contains(['/', '\\']) {
        return Err(ValidationError::InvalidTempPrefix(prefix.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::{ByteSize, HumanDuration};

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = Config::default();
        config.cache.default_ttl = HumanDuration::from_secs(0);
        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroDuration { field: "cache.default_ttl" })
        ));
    }

    #[test]
    fn test_empty_endpoint_only_matters_for_buildkite() {
        let mut config = Config::default();
        config.source.endpoint = "  ".to_string();
        assert!(matches!(validate(&config), Err(ValidationError::EmptyEndpoint)));

        config.source.provider = SourceProvider::Local;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_max_log_bytes_must_be_positive() {
        let mut config = Config::default();
        config.source.max_log_bytes = ByteSize(0);
        assert!(matches!(validate(&config), Err(ValidationError::InvalidMaxLogBytes)));
    }

    #[test]
    fn test_temp_prefix_without_separators() {
        let mut config = Config::default();
        config.delivery.temp_prefix = "../escape-".to_string();
        assert!(matches!(validate(&config), Err(ValidationError::InvalidTempPrefix(_))));

        config.delivery.temp_prefix = String::new();
        assert!(matches!(validate(&config), Err(ValidationError::InvalidTempPrefix(_))));
    }
}
