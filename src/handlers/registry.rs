use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, field, info_span, warn};
use uuid::Uuid;

use super::context::ToolContext;
use super::tools::{JobLogsTool, LogsInfoTool, ReadLogsTool, SearchLogsTool, TailLogsTool};
use super::traits::{HandlerError, LogTool, ToolOutput};
use crate::humanize::HumanDuration;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

/// Registry mapping tool names to tool instances
#[derive(Clone)]
pub struct ToolRegistry {
    ctx: Arc<ToolContext>,
    tools: BTreeMap<String, Arc<dyn LogTool>>,
}

impl ToolRegistry {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self {
            ctx,
            tools: BTreeMap::new(),
        }
    }

    /// Registry with the five log tools
    pub fn with_defaults(ctx: Arc<ToolContext>) -> Self {
        let mut registry = Self::new(ctx.clone());
        registry.register(Arc::new(LogsInfoTool::new(ctx.clone())));
        registry.register(Arc::new(TailLogsTool::new(ctx.clone())));
        registry.register(Arc::new(ReadLogsTool::new(ctx.clone())));
        registry.register(Arc::new(SearchLogsTool::new(ctx.clone())));
        registry.register(Arc::new(JobLogsTool::new(ctx)));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn LogTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn LogTool>, RegistryError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn context(&self) -> &Arc<ToolContext> {
        &self.ctx
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name(),
                description: tool.description(),
            })
            .collect()
    }

    /// Invoke a tool by name.
    ///
    /// Soft failures come back as an error [`ToolOutput`]; only unknown tools
    /// and internal defects are `Err`. The call is bounded by the configured
    /// request timeout and its scans are cancelled when this future is dropped.
    pub async fn call(&self, name: &str, args: Value) -> Result<ToolOutput, RegistryError> {
        let tool = self.get(name)?;
        let request_id = Uuid::now_v7();
        let span = info_span!(
            "tool_call",
            tool = name,
            %request_id,
            org = field::Empty,
            pipeline = field::Empty,
            build = field::Empty,
            job = field::Empty,
        );
        for identity in ["org", "pipeline", "build", "job"] {
            if let Some(value) = args.get(identity).and_then(Value::as_str) {
                span.record(identity, value);
            }
        }

        let metrics = self.ctx.metrics.clone();
        let timeout = self.ctx.request_timeout;
        async move {
            metrics.tool_called();

            let cancel = CancellationToken::new();
            let _guard = cancel.clone().drop_guard();
            let outcome = tokio::time::timeout(timeout, tool.call(args, cancel.clone())).await;

            let output = match outcome {
                Ok(Ok(output)) => output,
                Ok(Err(HandlerError::Internal(message))) => {
                    return Err(RegistryError::Internal(message));
                }
                Ok(Err(e)) => ToolOutput::error(e.to_string()),
                Err(_) => {
                    cancel.cancel();
                    ToolOutput::error(format!(
                        "tool call timed out after {}",
                        HumanDuration(timeout)
                    ))
                }
            };

            if output.is_error {
                metrics.soft_error();
                warn!(error = %output.text, "Tool call failed");
            }
            Ok(output)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{JobKey, MemoryCache, MemorySnapshot};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    fn registry() -> (ToolRegistry, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let key = JobKey::new("acme", "web", "1", "job");
        cache.insert(key.clone(), MemorySnapshot::from_lines(&key, &["one", "two"]));
        let ctx = ToolContext::builder().cache(cache.clone()).build();
        (ToolRegistry::with_defaults(Arc::new(ctx)), cache)
    }

    #[test]
    fn test_default_tools() {
        let (registry, _) = registry();
        let names: Vec<&str> = registry.descriptors().iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["get_job_logs", "get_logs_info", "read_logs", "search_logs", "tail_logs"]
        );
        assert!(registry.has_tool("tail_logs"));
        assert!(!registry.has_tool("delete_logs"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (registry, _) = registry();
        let err = registry.call("delete_logs", json!({})).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_validation_becomes_soft_error() {
        let (registry, cache) = registry();
        let output = registry
            .call("tail_logs", json!({"org": "acme", "pipeline": "web", "build": "1"}))
            .await
            .unwrap();
        assert!(output.is_error);
        assert!(output.text.starts_with("invalid arguments"));
        assert_eq!(cache.resolutions(), 0);
        assert_eq!(registry.context().metrics.snapshot().soft_errors, 1);
    }

    #[tokio::test]
    async fn test_successful_call() {
        let (registry, _) = registry();
        let output = registry
            .call(
                "read_logs",
                json!({"org": "acme", "pipeline": "web", "build": "1", "job": "job", "raw": true}),
            )
            .await
            .unwrap();
        assert!(!output.is_error);
        let value: Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(value["entries"], json!(["one", "two"]));
    }

    #[tokio::test]
    async fn test_file_write_failure_is_soft_io_error() {
        let root = tempfile::TempDir::new().unwrap();
        let cache = Arc::new(MemoryCache::new());
        let key = JobKey::new("acme", "web", "1", "job");
        let line = "x".repeat(99);
        let lines: Vec<&str> = std::iter::repeat_n(line.as_str(), 10).collect();
        cache.insert(key.clone(), MemorySnapshot::from_lines(&key, &lines));
        let ctx = ToolContext::builder()
            .cache(cache)
            .delivery(crate::delivery::DeliveryPolicy {
                threshold: 10,
                temp_root: Some(root.path().join("missing")),
                ..Default::default()
            })
            .build();
        let registry = ToolRegistry::with_defaults(Arc::new(ctx));

        let output = registry
            .call(
                "get_job_logs",
                json!({"org": "acme", "pipeline": "web", "build": "1", "job": "job"}),
            )
            .await
            .unwrap();

        assert!(output.is_error);
        assert!(output.text.starts_with("IOError:"), "{}", output.text);
        assert_eq!(registry.context().metrics.snapshot().file_deliveries, 0);
        assert_eq!(registry.context().metrics.snapshot().soft_errors, 1);
    }

    struct StallingTool;

    #[async_trait]
    impl LogTool for StallingTool {
        fn name(&self) -> &'static str {
            "stall"
        }

        fn description(&self) -> &'static str {
            "never finishes"
        }

        async fn call(&self, _args: Value, cancel: CancellationToken) -> Result<ToolOutput, HandlerError> {
            cancel.cancelled().await;
            Err(HandlerError::Internal("cancelled tool kept running".into()))
        }
    }

    #[tokio::test]
    async fn test_timeout_is_soft() {
        let cache = Arc::new(MemoryCache::new());
        let ctx = ToolContext::builder()
            .cache(cache)
            .request_timeout(Duration::from_millis(20))
            .build();
        let mut registry = ToolRegistry::new(Arc::new(ctx));
        registry.register(Arc::new(StallingTool));

        let output = registry.call("stall", json!({})).await.unwrap();
        assert!(output.is_error);
        assert_eq!(output.text, "tool call timed out after 20ms");
    }
}
