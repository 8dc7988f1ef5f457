use std::sync::Arc;

use crate::config::Config;
use crate::handlers::ToolRegistry;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ToolRegistry>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config, registry: ToolRegistry) -> Self {
        let metrics = registry.context().metrics.clone();
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            metrics,
        }
    }
}
