use std::sync::Arc;
use std::time::Instant;

use datagrid_core::{GridContext, GridRegistry};

#[derive(Clone)]
pub struct AppState {
    start: Instant,
    registry: Arc<GridRegistry>,
    grid_context: GridContext,
}

impl AppState {
    pub fn new(registry: GridRegistry, grid_context: GridContext) -> Self {
        Self {
            start: Instant::now(),
            registry: Arc::new(registry),
            grid_context,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    pub fn registry(&self) -> &GridRegistry {
        &self.registry
    }

    pub fn grid_context(&self) -> &GridContext {
        &self.grid_context
    }

    pub fn route_prefix(&self) -> &str {
        &self.grid_context.route_prefix
    }
}
