use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::collections::HashMap;

use super::{
    error::ApiError,
    models::{HealthResponse, MetricsResponse, ToolListResponse},
    state::AppState,
    utils,
};
use crate::handlers::ToolOutput;

/// Tool invocation endpoint (POST /tools/{name})
///
/// The body is the tool's argument object. Soft failures (bad arguments,
/// unreachable logs, invalid patterns, file write errors) are returned with
/// 200 and `is_error: true`; unknown tools are 404.
pub async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<Json<ToolOutput>, ApiError> {
    if !state.registry.has_tool(&name) {
        return Err(ApiError::NotFound(format!("tool {name}")));
    }

    // Must be application/json (optionally with charset parameter) when present
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        let content_type = content_type
            .to_str()
            .map_err(|_| ApiError::InvalidPayload("invalid Content-Type header".into()))?;
        utils::parse_content_type(content_type)?;
    }

    let max_size = usize::try_from(state.config.server.max_payload_bytes.as_u64()).unwrap_or(usize::MAX);
    let body_bytes = read_body(body, max_size).await?;
    let args = utils::parse_arguments(&body_bytes)?;

    let output = state.registry.call(&name, args).await?;
    Ok(Json(output))
}

/// Reads the request body, failing once more than `max_size` bytes arrive
///
/// Decompression is handled by RequestDecompressionLayer middleware, so the
/// limit applies to decompressed data.
async fn read_body(body: axum::body::Body, max_size: usize) -> Result<Vec<u8>, ApiError> {
    let data = Limited::new(body, max_size)
        .collect()
        .await
        .map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                ApiError::PayloadTooLarge(max_size)
            } else {
                ApiError::Internal(err.to_string())
            }
        })?
        .to_bytes()
        .to_vec();

    Ok(data)
}

/// Tool listing endpoint (GET /tools)
pub async fn list_tools(State(state): State<AppState>) -> impl IntoResponse {
    Json(ToolListResponse {
        tools: state.registry.descriptors(),
    })
}

/// Counter snapshot (GET /operators/metrics)
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(MetricsResponse {
        counters: state.metrics.snapshot(),
    })
}

/// Health check endpoint (GET /health)
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert(
        "tools".to_string(),
        if state.registry.descriptors().is_empty() {
            "unhealthy".to_string()
        } else {
            "healthy".to_string()
        },
    );

    let all_healthy = components.values().all(|status| status == "healthy");
    let (overall_status, status_code) = if all_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
