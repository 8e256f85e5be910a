pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::search::{SearchConfig, SearchService};
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub search: SearchService,
    pub default_limit: usize,
    pub max_limit: usize,
    pub metrics_enabled: bool,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(search: SearchService, config: &SearchConfig) -> Self {
        Self {
            search,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
            metrics_enabled: true,
            started_at: Instant::now(),
        }
    }

    /// Hide `/metrics` when Prometheus export is disabled
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}
