use crate::delivery::{DEFAULT_TEMP_PREFIX, DeliveryPolicy};
use crate::humanize::{ByteSize, HumanDuration};
use crate::source::HttpConfig;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Upper bound on a single tool call
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            request_timeout: default_request_timeout(),
            max_payload_bytes: default_max_payload_bytes(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(60)
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(1024 * 1024) // 1 MB
}

fn default_max_concurrent_requests() -> usize {
    64
}

/// Cache store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Used when a request carries no usable `cache_ttl`
    #[serde(default = "default_ttl")]
    pub default_ttl: HumanDuration,
    /// Age after which `logbox prune` drops a cached log
    #[serde(default = "default_retention")]
    pub retention: HumanDuration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            default_ttl: default_ttl(),
            retention: default_retention(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/cache")
}

fn default_ttl() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_retention() -> HumanDuration {
    HumanDuration::from_secs(24 * 3600)
}

/// Where raw logs are downloaded from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceProvider {
    #[default]
    Buildkite,
    Local,
}

/// Log source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub provider: SourceProvider,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Directory holding `{org}/{pipeline}/{build}/{job}.log` for the local provider
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_max_log_bytes")]
    pub max_log_bytes: ByteSize,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_source_timeout")]
    pub request_timeout: HumanDuration,
    /// API token (loaded from environment, not from config file)
    #[serde(skip)]
    pub api_token: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            provider: SourceProvider::default(),
            endpoint: default_endpoint(),
            root: default_root(),
            max_log_bytes: default_max_log_bytes(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_source_timeout(),
            api_token: None,
        }
    }
}

impl SourceConfig {
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            endpoint: self.endpoint.clone(),
            api_token: self.api_token.clone(),
            connect_timeout: self.connect_timeout.as_duration(),
            request_timeout: self.request_timeout.as_duration(),
            max_log_bytes: self.max_log_bytes.as_u64(),
            ..HttpConfig::default()
        }
    }
}

fn default_endpoint() -> String {
    "https://api.buildkite.com/v2".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from("data/logs")
}

fn default_max_log_bytes() -> ByteSize {
    ByteSize(512 * 1024 * 1024) // 512 MB
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_source_timeout() -> HumanDuration {
    HumanDuration::from_secs(60)
}

/// Whole-log delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// Estimated tokens above which logs go to a file; 0 keeps everything inline
    #[serde(default)]
    pub job_log_token_threshold: i64,
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_root: Option<PathBuf>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            job_log_token_threshold: 0,
            temp_prefix: default_temp_prefix(),
            temp_root: None,
        }
    }
}

impl DeliveryConfig {
    pub fn policy(&self) -> DeliveryPolicy {
        DeliveryPolicy {
            threshold: self.job_log_token_threshold,
            temp_prefix: self.temp_prefix.clone(),
            temp_root: self.temp_root.clone(),
        }
    }
}

fn default_temp_prefix() -> String {
    DEFAULT_TEMP_PREFIX.to_string()
}

/// Defaults applied to query requests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    #[serde(default = "default_tail")]
    pub default_tail: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_tail: default_tail(),
        }
    }
}

fn default_limit() -> u64 {
    100
}

fn default_tail() -> i64 {
    10
}
