//! Buildkite REST API log source

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url, header};
use std::time::Duration;
use tracing::debug;

use super::{LogSource, Result, SourceError, check_size};
use crate::cache::JobKey;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub endpoint: String,
    pub api_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_log_bytes: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.buildkite.com/v2".to_string(),
            api_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_log_bytes: 512 * 1024 * 1024,
            user_agent: format!("logbox/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Downloads job logs from the Buildkite REST API
pub struct BuildkiteSource {
    client: Client,
    base: Url,
    config: HttpConfig,
}

impl BuildkiteSource {
    pub fn new(config: HttpConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(SourceError::InvalidConfig("endpoint must not be empty".into()));
        }
        let base = Url::parse(config.endpoint.trim())
            .map_err(|e| SourceError::InvalidConfig(format!("invalid endpoint: {}", e)))?;
        if base.cannot_be_a_base() {
            return Err(SourceError::InvalidConfig(format!(
                "endpoint cannot be a base URL: {}",
                base
            )));
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base,
            config,
        })
    }

    /// Each identity field is pushed as one escaped path segment
    fn log_url(&self, key: &JobKey) -> Result<Url> {
        if let Some(segment) = key.segments().into_iter().find(|s| matches!(*s, "." | "..")) {
            return Err(SourceError::InvalidKey(format!(
                "{:?} is not a valid path segment",
                segment
            )));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidConfig("endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .extend([
                "organizations",
                key.org.as_str(),
                "pipelines",
                key.pipeline.as_str(),
                "builds",
                key.build.as_str(),
                "jobs",
                key.job.as_str(),
                "log",
            ]);
        Ok(url)
    }
}

#[async_trait]
impl LogSource for BuildkiteSource {
    async fn fetch(&self, key: &JobKey) -> Result<Bytes> {
        let url = self.log_url(key)?;
        debug!(%url, "Requesting job log");

        let mut request = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "text/plain");
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::RequestFailed(format!("timed out fetching {}", url))
            } else {
                SourceError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        if let Some(length) = response.content_length() {
            check_size(key, length, self.config.max_log_bytes)?;
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;
        check_size(key, bytes.len() as u64, self.config.max_log_bytes)?;

        debug!(job = %key, size = bytes.len(), "Downloaded job log");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_url() {
        let source = BuildkiteSource::new(HttpConfig {
            endpoint: "https://api.example.com/v2/".to_string(),
            ..HttpConfig::default()
        })
        .unwrap();
        let key = JobKey::new("acme", "web", "42", "job-1");
        assert_eq!(
            source.log_url(&key).unwrap().as_str(),
            "https://api.example.com/v2/organizations/acme/pipelines/web/builds/42/jobs/job-1/log"
        );
    }

    #[test]
    fn test_log_url_escapes_segments() {
        let source = BuildkiteSource::new(HttpConfig {
            endpoint: "https://api.example.com/v2".to_string(),
            ..HttpConfig::default()
        })
        .unwrap();

        let key = JobKey::new("acme/../../user", "web", "42", "job?x=1");
        let url = source.log_url(&key).unwrap();
        assert_eq!(url.host_str(), Some("api.example.com"));
        assert_eq!(
            url.path(),
            "/v2/organizations/acme%2F..%2F..%2Fuser/pipelines/web/builds/42/jobs/job%3Fx=1/log"
        );
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_dot_segments_rejected() {
        let source = BuildkiteSource::new(HttpConfig::default()).unwrap();
        for key in [
            JobKey::new("..", "web", "42", "job-1"),
            JobKey::new("acme", ".", "42", "job-1"),
        ] {
            assert!(matches!(source.log_url(&key), Err(SourceError::InvalidKey(_))));
        }
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let result = BuildkiteSource::new(HttpConfig {
            endpoint: " ".to_string(),
            ..HttpConfig::default()
        });
        assert!(matches!(result, Err(SourceError::InvalidConfig(_))));
    }
}
