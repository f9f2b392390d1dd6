//! Observability Module
//!
//! - `events`: structured lifecycle events with consistent fields
//! - `metrics`: counters, gauges and histograms through the `metrics` facade

pub mod events;
pub mod metrics;

pub use metrics::describe_metrics;
