use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "LOGBOX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/logbox.toml";
const ENV_PREFIX: &str = "LOGBOX";
const ENV_SEPARATOR: &str = "__";

const API_TOKEN_ENV_VAR: &str = "BUILDKITE_API_TOKEN";
const LEGACY_THRESHOLD_ENV_VAR: &str = "JOB_LOG_TOKEN_THRESHOLD";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;
    load_secrets(&mut config);
    apply_legacy_threshold(&mut config, env::var(LEGACY_THRESHOLD_ENV_VAR).ok());

    Ok(config)
}

/// Secrets are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config) {
    if let Ok(token) = env::var(API_TOKEN_ENV_VAR) {
        if !token.is_empty() {
            config.source.api_token = Some(token);
        }
    }
}

/// `JOB_LOG_TOKEN_THRESHOLD` predates the `[delivery]` section and still wins
/// when set to an integer
pub(crate) fn apply_legacy_threshold(config: &mut Config, value: Option<String>) {
    let Some(value) = value else {
        return;
    };
    match value.trim().parse::<i64>() {
        Ok(threshold) => config.delivery.job_log_token_threshold = threshold,
        Err(_) => tracing::warn!(
            value = %value,
            "Ignoring non-integer {}",
            LEGACY_THRESHOLD_ENV_VAR
        ),
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // LOGBOX__SERVER__BIND_ADDR -> server.bind_addr
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceProvider;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.cache.default_ttl.as_duration(), Duration::from_secs(30));
        assert_eq!(config.delivery.job_log_token_threshold, 0);
        assert_eq!(config.delivery.temp_prefix, "job-logs-");
        assert_eq!(config.query.default_limit, 100);
        assert_eq!(config.source.provider, SourceProvider::Buildkite);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9000"
request_timeout = "2m"

[cache]
path = "/var/lib/logbox"
default_ttl = "1m30s"
retention = "7d"

[source]
provider = "local"
root = "fixtures/logs"
max_log_bytes = "64MB"

[delivery]
job_log_token_threshold = 5000
temp_prefix = "ci-logs-"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.server.request_timeout.as_duration(), Duration::from_secs(120));
        assert_eq!(config.cache.default_ttl.as_duration(), Duration::from_secs(90));
        assert_eq!(config.cache.retention.as_duration(), Duration::from_secs(7 * 86400));
        assert_eq!(config.source.provider, SourceProvider::Local);
        assert_eq!(config.source.max_log_bytes.as_u64(), 64 * 1024 * 1024);
        assert_eq!(config.delivery.policy().threshold, 5000);
        assert_eq!(config.delivery.policy().temp_prefix, "ci-logs-");
    }

    #[test]
    fn test_legacy_threshold() {
        let mut config = Config::default();
        apply_legacy_threshold(&mut config, Some("250".to_string()));
        assert_eq!(config.delivery.job_log_token_threshold, 250);

        apply_legacy_threshold(&mut config, Some("lots".to_string()));
        assert_eq!(config.delivery.job_log_token_threshold, 250);

        apply_legacy_threshold(&mut config, None);
        assert_eq!(config.delivery.job_log_token_threshold, 250);
    }
}
