//! The five log tools
//!
//! Each tool validates its arguments, compiles anything that can fail before
//! touching the cache, resolves the snapshot and then runs the scan on the
//! blocking pool.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::context::ToolContext;
use super::traits::{HandlerError, LogTool, ToolOutput};
use super::types::{
    InfoParams, InfoResponse, JobLogsParams, JobLogsResponse, ReadParams, ReadResponse,
    SearchHit, SearchParams, SearchResponse, TailParams, TailResponse,
};
use crate::delivery::{self, DeliveryMode};
use crate::format::{self, Formatter};
use crate::query::{self, QueryError, SearchOptions, SearchQuery};

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, HandlerError> {
    serde_json::from_value(args)
        .map_err(|e| HandlerError::Validation(format!("invalid arguments: {}", e)))
}

/// Run a scan on the blocking pool
async fn blocking<T, F>(scan: F) -> Result<T, HandlerError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, HandlerError> + Send + 'static,
{
    tokio::task::spawn_blocking(scan)
        .await
        .map_err(|e| HandlerError::Internal(format!("query task failed: {}", e)))?
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

pub struct LogsInfoTool {
    ctx: Arc<ToolContext>,
}

impl LogsInfoTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl LogTool for LogsInfoTool {
    fn name(&self) -> &'static str {
        "get_logs_info"
    }

    fn description(&self) -> &'static str {
        "Get metadata about a job's cached log: row count, size, groups, commands and fetch time"
    }

    async fn call(&self, args: Value, _cancel: CancellationToken) -> Result<ToolOutput, HandlerError> {
        let params: InfoParams = parse_args(args)?;
        let key = params.job.key()?;

        let snapshot = self.ctx.resolve(&key, &params.cache).await?;
        let started = Instant::now();
        let info = query::info(snapshot.as_ref());

        ToolOutput::json(&InfoResponse {
            file_info: info.into(),
            query_time_ms: elapsed_ms(started),
        })
    }
}

pub struct TailLogsTool {
    ctx: Arc<ToolContext>,
}

impl TailLogsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl LogTool for TailLogsTool {
    fn name(&self) -> &'static str {
        "tail_logs"
    }

    fn description(&self) -> &'static str {
        "Show the last N entries of a job log. Entries are rendered as `format`: json-terse (default), json or text, or as bare strings with `raw`; any other format is rejected as invalid arguments."
    }

    async fn call(&self, args: Value, cancel: CancellationToken) -> Result<ToolOutput, HandlerError> {
        let params: TailParams = parse_args(args)?;
        let key = params.job.key()?;
        let n = match params.tail {
            Some(n) if n > 0 => n,
            _ => self.ctx.default_tail,
        };
        let formatter = params.output.formatter();

        let snapshot = self.ctx.resolve(&key, &params.cache).await?;
        let started = Instant::now();
        let (entries, total_rows) = blocking(move || {
            let entries = query::tail(snapshot.as_ref(), n, &cancel)
                .map(|entry| entry.map(|e| formatter.format_entry(&e)))
                .collect::<Result<Vec<_>, QueryError>>()?;
            Ok((entries, snapshot.row_count()))
        })
        .await?;

        ToolOutput::json(&TailResponse {
            entries,
            total_rows,
            query_time_ms: elapsed_ms(started),
        })
    }
}

pub struct ReadLogsTool {
    ctx: Arc<ToolContext>,
}

impl ReadLogsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl LogTool for ReadLogsTool {
    fn name(&self) -> &'static str {
        "read_logs"
    }

    fn description(&self) -> &'static str {
        "Read job log entries forward from a row offset with a row limit. Entries are rendered as `format`: json-terse (default), json or text, or as bare strings with `raw`; any other format is rejected as invalid arguments."
    }

    async fn call(&self, args: Value, cancel: CancellationToken) -> Result<ToolOutput, HandlerError> {
        let params: ReadParams = parse_args(args)?;
        let key = params.job.key()?;
        let seek = params.seek.unwrap_or(0);
        let limit = params.limit.unwrap_or(self.ctx.default_limit);
        let formatter = params.output.formatter();

        let snapshot = self.ctx.resolve(&key, &params.cache).await?;
        let started = Instant::now();
        let entries = blocking(move || {
            let entries = query::read(snapshot.as_ref(), seek, limit, &cancel)
                .map(|entry| entry.map(|e| formatter.format_entry(&e)))
                .collect::<Result<Vec<_>, QueryError>>()?;
            Ok(entries)
        })
        .await?;

        ToolOutput::json(&ReadResponse {
            entries,
            query_time_ms: elapsed_ms(started),
        })
    }
}

pub struct SearchLogsTool {
    ctx: Arc<ToolContext>,
}

impl SearchLogsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

fn to_hit(formatter: &Formatter, result: query::SearchResult) -> SearchHit {
    SearchHit {
        row_number: result.row_number,
        before: formatter.format_entries(&result.before),
        matched: formatter.format_entry(&result.matched),
        after: formatter.format_entries(&result.after),
    }
}

#[async_trait]
impl LogTool for SearchLogsTool {
    fn name(&self) -> &'static str {
        "search_logs"
    }

    fn description(&self) -> &'static str {
        "Search a job log with a regular expression, with optional context lines, inversion and reverse scanning. Entries are rendered as `format`: json-terse (default), json or text, or as bare strings with `raw`; any other format is rejected as invalid arguments."
    }

    async fn call(&self, args: Value, cancel: CancellationToken) -> Result<ToolOutput, HandlerError> {
        let params: SearchParams = parse_args(args)?;
        let key = params.job.key()?;
        let formatter = params.output.formatter();

        let options = SearchOptions::builder()
            .pattern(params.pattern)
            .case_sensitive(params.case_sensitive)
            .invert_match(params.invert_match)
            .reverse(params.reverse)
            .context(params.context)
            .maybe_before_context(params.before_context)
            .maybe_after_context(params.after_context)
            .maybe_seek_start(params.seek_start)
            .limit(params.limit.unwrap_or(self.ctx.default_limit))
            .build();
        // An invalid pattern must fail before any cache access
        let search = SearchQuery::compile(&options)?;

        let snapshot = self.ctx.resolve(&key, &params.cache).await?;
        let started = Instant::now();
        let results = blocking(move || {
            let results = query::search(snapshot.as_ref(), &search, &cancel)
                .map(|result| result.map(|r| to_hit(&formatter, r)))
                .collect::<Result<Vec<_>, QueryError>>()?;
            Ok(results)
        })
        .await?;

        debug!(job = %key, matches = results.len(), "Search finished");
        ToolOutput::json(&SearchResponse {
            match_count: results.len(),
            results,
            query_time_ms: elapsed_ms(started),
        })
    }
}

pub struct JobLogsTool {
    ctx: Arc<ToolContext>,
}

impl JobLogsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl LogTool for JobLogsTool {
    fn name(&self) -> &'static str {
        "get_job_logs"
    }

    fn description(&self) -> &'static str {
        "Get the whole log of a job; large logs are written to a file and the path is returned instead"
    }

    async fn call(&self, args: Value, cancel: CancellationToken) -> Result<ToolOutput, HandlerError> {
        let params: JobLogsParams = parse_args(args)?;
        let key = params.job.key()?;

        let snapshot = self.ctx.resolve(&key, &params.cache).await?;
        let policy = self.ctx.delivery.clone();
        let result = blocking(move || {
            let entries = query::read(snapshot.as_ref(), 0, 0, &cancel)
                .collect::<Result<Vec<_>, QueryError>>()?;
            let text = format::plain_text(&entries);
            Ok(delivery::deliver(text, &policy)?)
        })
        .await?;

        if result.mode == DeliveryMode::File {
            self.ctx.metrics.file_delivered();
            info!(
                job = %key,
                estimated_tokens = result.estimated_tokens,
                "Job log delivered as file"
            );
        }

        ToolOutput::json(&JobLogsResponse {
            delivery_mode: result.mode,
            content: result.content,
            file_path: result.file_path,
            file_size_bytes: result.file_size_bytes,
            estimated_tokens: result.estimated_tokens,
            reason: result.reason,
            job: key.job,
            build: key.build,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{JobKey, MemoryCache, MemorySnapshot};
    use crate::delivery::DeliveryPolicy;
    use serde_json::json;
    use tempfile::TempDir;

    fn key() -> JobKey {
        JobKey::new("acme", "web", "12", "job-1")
    }

    fn args(extra: Value) -> Value {
        let mut base = json!({"org": "acme", "pipeline": "web", "build": "12", "job": "job-1"});
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        base
    }

    fn context(lines: &[&str], delivery: DeliveryPolicy) -> (Arc<ToolContext>, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        cache.insert(key(), MemorySnapshot::from_lines(&key(), lines));
        let ctx = ToolContext::builder()
            .cache(cache.clone())
            .delivery(delivery)
            .build();
        (Arc::new(ctx), cache)
    }

    fn body(output: &ToolOutput) -> Value {
        assert!(!output.is_error, "unexpected error: {}", output.text);
        serde_json::from_str(&output.text).unwrap()
    }

    #[tokio::test]
    async fn test_tail_in_text_format() {
        let lines: Vec<String> = (0..1000).map(|i| format!("line {}", i)).collect();
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (ctx, _) = context(&lines, DeliveryPolicy::default());

        let output = TailLogsTool::new(ctx)
            .call(args(json!({"tail": 5, "format": "text"})), CancellationToken::new())
            .await
            .unwrap();
        let value = body(&output);
        assert_eq!(
            value["entries"],
            json!(["line 995", "line 996", "line 997", "line 998", "line 999"])
        );
        assert_eq!(value["total_rows"], 1000);
    }

    #[tokio::test]
    async fn test_read_defaults_to_terse() {
        let (ctx, _) = context(&["a", "b", "c"], DeliveryPolicy::default());
        let output = ReadLogsTool::new(ctx)
            .call(args(json!({"seek": 1, "limit": 1})), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body(&output)["entries"], json!([{"c": "b", "rn": 1}]));
    }

    #[tokio::test]
    async fn test_search_with_context() {
        let (ctx, _) = context(
            &["ok", "setup", "warn", "ERROR: x", "after1", "after2", "ok"],
            DeliveryPolicy::default(),
        );
        let output = SearchLogsTool::new(ctx)
            .call(
                args(json!({"pattern": "error", "before_context": 2, "after_context": 1, "raw": true})),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        let value = body(&output);
        assert_eq!(value["match_count"], 1);
        assert_eq!(value["results"][0]["row_number"], 3);
        assert_eq!(value["results"][0]["before"], json!(["setup", "warn"]));
        assert_eq!(value["results"][0]["match"], "ERROR: x");
        assert_eq!(value["results"][0]["after"], json!(["after1"]));
    }

    #[tokio::test]
    async fn test_invalid_pattern_skips_cache() {
        let (ctx, cache) = context(&["a"], DeliveryPolicy::default());
        let err = SearchLogsTool::new(ctx)
            .call(args(json!({"pattern": "["})), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_soft());
        assert!(err.to_string().starts_with("invalid regex pattern"));
        assert_eq!(cache.resolutions(), 0);
    }

    #[tokio::test]
    async fn test_unknown_job_reports_reader_failure() {
        let (ctx, _) = context(&["a"], DeliveryPolicy::default());
        let err = LogsInfoTool::new(ctx)
            .call(
                json!({"org": "acme", "pipeline": "web", "build": "12", "job": "other"}),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(err.is_soft());
        assert!(err.to_string().starts_with("Failed to create log reader:"));
    }

    #[tokio::test]
    async fn test_info() {
        let (ctx, _) = context(&["a", "b"], DeliveryPolicy::default());
        let output = LogsInfoTool::new(ctx)
            .call(args(json!({})), CancellationToken::new())
            .await
            .unwrap();
        let value = body(&output);
        assert_eq!(value["file_info"]["row_count"], 2);
        assert_eq!(value["file_info"]["cache_file"], "memory://acme/web/12/job-1");
    }

    #[tokio::test]
    async fn test_job_logs_inline() {
        let (ctx, _) = context(&["\x1b[32mgreen\x1b[0m", "plain"], DeliveryPolicy::default());
        let output = JobLogsTool::new(ctx)
            .call(args(json!({})), CancellationToken::new())
            .await
            .unwrap();
        let value = body(&output);
        assert_eq!(value["delivery_mode"], "inline");
        assert_eq!(value["content"], "green\nplain\n");
        assert_eq!(value["estimated_tokens"], 3);
        assert_eq!(value["job"], "job-1");
        assert_eq!(value["build"], "12");
    }

    #[tokio::test]
    async fn test_job_logs_file_mode() {
        let root = TempDir::new().unwrap();
        let line = "x".repeat(199);
        let lines: Vec<&str> = std::iter::repeat_n(line.as_str(), 10).collect();
        let policy = DeliveryPolicy {
            threshold: 100,
            temp_root: Some(root.path().to_path_buf()),
            ..DeliveryPolicy::default()
        };
        let (ctx, _) = context(&lines, policy);
        let metrics = ctx.metrics.clone();

        let output = JobLogsTool::new(ctx)
            .call(args(json!({})), CancellationToken::new())
            .await
            .unwrap();
        let value = body(&output);
        assert_eq!(value["delivery_mode"], "file");
        assert_eq!(value["estimated_tokens"], 500);
        assert!(value.get("content").is_none());

        let path = value["file_path"].as_str().unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(written, format!("{}\n", line).repeat(10));
        assert_eq!(value["file_size_bytes"], 2000);
        assert_eq!(metrics.snapshot().file_deliveries, 1);
    }

    #[tokio::test]
    async fn test_non_positive_tail_uses_configured_default() {
        let cache = Arc::new(MemoryCache::new());
        cache.insert(key(), MemorySnapshot::from_lines(&key(), &["a", "b", "c", "d", "e"]));
        let ctx = Arc::new(ToolContext::builder().cache(cache).default_tail(3).build());

        for tail in [json!(0), json!(-4), Value::Null] {
            let output = TailLogsTool::new(ctx.clone())
                .call(args(json!({"tail": tail, "raw": true})), CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(body(&output)["entries"], json!(["c", "d", "e"]));
        }
    }

    #[test]
    fn test_descriptions_list_formats() {
        let (ctx, _) = context(&[], DeliveryPolicy::default());
        let tools: [Box<dyn LogTool>; 3] = [
            Box::new(TailLogsTool::new(ctx.clone())),
            Box::new(ReadLogsTool::new(ctx.clone())),
            Box::new(SearchLogsTool::new(ctx)),
        ];
        for tool in tools {
            assert!(tool.description().contains("json-terse (default), json or text"));
            assert!(tool.description().contains("rejected"));
        }
    }

    #[tokio::test]
    async fn test_unknown_format_is_rejected() {
        let (ctx, _) = context(&["a"], DeliveryPolicy::default());
        let err = ReadLogsTool::new(ctx)
            .call(args(json!({"format": "yaml"})), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cancelled_call() {
        let (ctx, _) = context(&["a", "b"], DeliveryPolicy::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ReadLogsTool::new(ctx)
            .call(args(json!({})), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Query(QueryError::Cancelled)));
    }
}
