//! Application State
//!
//! Shared state passed to all API handlers.

use crate::observability::MetricsState;
use hearth_core::Node;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<Node>,
    pub metrics_state: Option<MetricsState>,
}

impl AppState {
    pub fn new(node: Arc<Node>) -> Self {
        Self {
            node,
            metrics_state: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsState) -> Self {
        self.metrics_state = Some(metrics);
        self
    }
}
