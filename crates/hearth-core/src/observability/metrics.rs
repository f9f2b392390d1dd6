//! Runtime Metrics
//!
//! Records runtime metrics through the `metrics` facade. Nothing is exported
//! unless the host process installs a recorder.
//!
//! Metrics tracked:
//! - `hearth_activation_count` - gauge of live activations on this member
//! - `hearth_activations_created_total` - counter of activations created, by kind
//! - `hearth_activations_evicted_total` - counter of evictions, by kind and reason
//! - `hearth_invocations_total` - counter of calls, by route and outcome
//! - `hearth_invocation_duration_seconds` - histogram of call latency, by route
//! - `hearth_topology_changes_total` - counter of applied membership views
//! - `hearth_member_count` - gauge of Active members in the current view

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Register descriptions for all metrics
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    describe_gauge!(
        "hearth_activation_count",
        "Number of live grain activations on this member"
    );
    describe_counter!(
        "hearth_activations_created_total",
        "Total number of grain activations created"
    );
    describe_counter!(
        "hearth_activations_evicted_total",
        "Total number of grain activations evicted"
    );
    describe_counter!(
        "hearth_invocations_total",
        "Total number of grain invocations"
    );
    describe_histogram!(
        "hearth_invocation_duration_seconds",
        "Duration of grain invocations in seconds"
    );
    describe_counter!(
        "hearth_topology_changes_total",
        "Total number of applied membership views"
    );
    describe_gauge!(
        "hearth_member_count",
        "Number of Active members in the current view"
    );
}

/// Record that an activation was created
pub fn record_activation_created(kind: &str) {
    counter!("hearth_activations_created_total", "kind" => kind.to_string()).increment(1);
    gauge!("hearth_activation_count").increment(1.0);
}

/// Record that an activation was evicted
pub fn record_activation_evicted(kind: &str, reason: &str) {
    counter!(
        "hearth_activations_evicted_total",
        "kind" => kind.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
    gauge!("hearth_activation_count").decrement(1.0);
}

/// Record a finished invocation
pub fn record_invocation(route: &'static str, outcome: &'static str, duration: Duration) {
    counter!("hearth_invocations_total", "route" => route, "outcome" => outcome).increment(1);
    histogram!("hearth_invocation_duration_seconds", "route" => route)
        .record(duration.as_secs_f64());
}

/// Record a topology change
pub fn record_topology_change(active_members: usize) {
    counter!("hearth_topology_changes_total").increment(1);
    gauge!("hearth_member_count").set(active_members as f64);
}
