use bon::Builder;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::types::CacheParams;
use crate::cache::{DEFAULT_CACHE_TTL, JobKey, LogCache, LogSnapshot, ResolveOptions};
use crate::config::Config;
use crate::delivery::DeliveryPolicy;
use crate::humanize::HumanDuration;
use crate::observability::Metrics;
use crate::query::{DEFAULT_TAIL, QueryError};

/// Shared dependencies and defaults of the tools
#[derive(Builder)]
pub struct ToolContext {
    pub cache: Arc<dyn LogCache>,
    #[builder(default = DEFAULT_CACHE_TTL)]
    pub default_ttl: Duration,
    #[builder(default = 100)]
    pub default_limit: u64,
    #[builder(default = DEFAULT_TAIL as i64)]
    pub default_tail: i64,
    #[builder(default)]
    pub delivery: DeliveryPolicy,
    #[builder(default = Duration::from_secs(60))]
    pub request_timeout: Duration,
    #[builder(default = Arc::new(Metrics::new()))]
    pub metrics: Arc<Metrics>,
}

impl ToolContext {
    pub fn from_config(config: &Config, cache: Arc<dyn LogCache>, metrics: Arc<Metrics>) -> Self {
        Self::builder()
            .cache(cache)
            .default_ttl(config.cache.default_ttl.as_duration())
            .default_limit(config.query.default_limit)
            .default_tail(config.query.default_tail)
            .delivery(config.delivery.policy())
            .request_timeout(config.server.request_timeout.as_duration())
            .metrics(metrics)
            .build()
    }

    pub fn resolve_options(&self, params: &CacheParams) -> ResolveOptions {
        ResolveOptions {
            ttl: parse_ttl(params.cache_ttl.as_deref(), self.default_ttl),
            force_refresh: params.force_refresh,
        }
    }

    pub async fn resolve(
        &self,
        key: &JobKey,
        params: &CacheParams,
    ) -> Result<Arc<dyn LogSnapshot>, QueryError> {
        let options = self.resolve_options(params);
        Ok(self.cache.resolve(key, options).await?)
    }
}

/// Parse a request `cache_ttl`, falling back to `default` when it is absent
/// or unparsable
pub fn parse_ttl(raw: Option<&str>, default: Duration) -> Duration {
    let raw = match raw.map(str::trim) {
        None | Some("") => return default,
        Some(raw) => raw,
    };
    match raw.parse::<HumanDuration>() {
        Ok(ttl) => ttl.as_duration(),
        Err(e) => {
            warn!(
                cache_ttl = raw,
                error = %e,
                default = %HumanDuration(default),
                "Invalid cache_ttl, using default"
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[test]
    fn test_parse_ttl() {
        let default = Duration::from_secs(30);
        assert_eq!(parse_ttl(None, default), default);
        assert_eq!(parse_ttl(Some(""), default), default);
        assert_eq!(parse_ttl(Some("5m"), default), Duration::from_secs(300));
        assert_eq!(parse_ttl(Some("250ms"), default), Duration::from_millis(250));
        assert_eq!(parse_ttl(Some("soon"), default), default);
        assert_eq!(parse_ttl(Some("-5s"), default), default);
    }

    #[test]
    fn test_builder_defaults() {
        let ctx = ToolContext::builder().cache(Arc::new(MemoryCache::new())).build();
        assert_eq!(ctx.default_ttl, Duration::from_secs(30));
        assert_eq!(ctx.default_limit, 100);
        assert_eq!(ctx.default_tail, 10);
        assert_eq!(ctx.delivery.threshold, 0);

        let options = ctx.resolve_options(&CacheParams {
            cache_ttl: Some("1h".to_string()),
            force_refresh: true,
        });
        assert_eq!(options.ttl, Duration::from_secs(3600));
        assert!(options.force_refresh);
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.delivery.job_log_token_threshold = 42;
        let ctx = ToolContext::from_config(
            &config,
            Arc::new(MemoryCache::new()),
            Arc::new(Metrics::new()),
        );
        assert_eq!(ctx.delivery.threshold, 42);
        assert_eq!(ctx.request_timeout, Duration::from_secs(60));
    }
}
