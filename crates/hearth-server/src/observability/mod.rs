//! Observability Module
//!
//! - `tracing`: subscriber setup with text or JSON output
//! - `metrics`: Prometheus recorder and render handle
//!
//! Lifecycle events and metric names live in `hearth_core::observability`.

pub mod metrics;
pub mod tracing;

pub use self::metrics::{detached_metrics, init_metrics, MetricsState};
pub use self::tracing::{init_tracing, TracingConfig};
