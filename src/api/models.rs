//! Transport models
//!
//! Tool calls are `POST /tools/{name}` with the tool arguments as a JSON
//! object; the response is always the [`ToolOutput`](crate::handlers::ToolOutput)
//! envelope, with `is_error` set for soft failures:
//!
//! ```json
//! {"is_error": false, "text": "{\"entries\":[{\"c\":\"done\",\"rn\":41}],\"total_rows\":42,\"query_time_ms\":0}"}
//! ```

use serde::Serialize;
use std::collections::HashMap;

use crate::handlers::ToolDescriptor;
use crate::observability::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub counters: MetricsSnapshot,
}
