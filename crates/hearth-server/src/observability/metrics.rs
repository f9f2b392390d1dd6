//! Prometheus Export
//!
//! Installs the Prometheus recorder behind the `metrics` facade that
//! `hearth-core` records into, and keeps the handle used by `GET /metrics`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// State containing the Prometheus handle for metrics export
#[derive(Clone)]
pub struct MetricsState {
    pub prometheus_handle: PrometheusHandle,
}

impl MetricsState {
    pub fn render(&self) -> String {
        self.prometheus_handle.render()
    }
}

/// Install the global Prometheus recorder and describe the runtime metrics.
///
/// Fails if a recorder is already installed.
pub fn init_metrics() -> anyhow::Result<MetricsState> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    hearth_core::observability::describe_metrics();

    Ok(MetricsState {
        prometheus_handle: handle,
    })
}

/// Recorder-less handle for tests; renders whatever was recorded into it.
pub fn detached_metrics() -> MetricsState {
    let recorder = PrometheusBuilder::new().build_recorder();
    MetricsState {
        prometheus_handle: recorder.handle(),
    }
}
