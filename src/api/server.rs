use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::{
    services::{call_tool, health, list_tools, metrics},
    state::AppState,
};
use crate::cache::FjallCache;
use crate::config::{Config, SourceConfig, SourceProvider};
use crate::handlers::{ToolContext, ToolRegistry};
use crate::observability::Metrics;
use crate::source::{BuildkiteSource, LogSource, ObjectStoreSource, SourceError};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Log source selected by `[source].provider`
pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn LogSource>, SourceError> {
    match config.provider {
        SourceProvider::Buildkite => {
            if config.api_token.is_none() {
                tracing::warn!("BUILDKITE_API_TOKEN is not set, requests will be unauthenticated");
            }
            Ok(Arc::new(BuildkiteSource::new(config.http_config())?))
        }
        SourceProvider::Local => {
            info!(root = %config.root.display(), "Serving job logs from local directory");
            Ok(Arc::new(ObjectStoreSource::local(
                &config.root,
                config.max_log_bytes.as_u64(),
            )?))
        }
    }
}

/// Open the Fjall cache with the configured log source
pub fn open_cache(config: &Config, metrics: Arc<Metrics>) -> Result<FjallCache, AnyError> {
    let source = build_source(&config.source)
        .map_err(|e| format!("Failed to create log source: {}", e))?;

    let cache = FjallCache::open(&config.cache.path, source)
        .map_err(|e| format!("Failed to open Fjall cache: {}", e))?
        .with_metrics(metrics);
    Ok(cache)
}

pub fn router(state: AppState) -> Router {
    let max_concurrent = state.config.server.max_concurrent_requests;
    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/{name}", post(call_tool))
        .route("/operators/metrics", get(metrics))
        .route("/operators/health", get(health))
        .route("/health", get(health))
        .with_state(state)
        // Automatically decompress gzip request bodies
        .layer(RequestDecompressionLayer::new())
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    let metrics = Arc::new(Metrics::new());
    let cache = open_cache(&config, metrics.clone())?;

    let ctx = ToolContext::from_config(&config, Arc::new(cache), metrics);
    let registry = ToolRegistry::with_defaults(Arc::new(ctx));
    let address = config.server.bind_addr;
    let state = AppState::new(config, registry);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "logbox API listening");

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
