//! Dialer metrics
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and describe dialer metrics
pub fn init_metrics() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        "outdial_dispatch_total",
        "Dispatch requests by outcome (dialing, gated, failed)"
    );
    describe_counter!(
        "outdial_calls_finished_total",
        "Call sessions that reached a terminal state, by state and reason"
    );
    describe_counter!(
        "outdial_transfers_total",
        "Transfer attempts by outcome"
    );
    describe_counter!(
        "outdial_trunk_events_total",
        "Trunk events by disposition"
    );
    describe_gauge!(
        "outdial_active_sessions",
        "Number of live call sessions"
    );

    Ok(handle)
}

/// Record a dispatch outcome
pub fn record_dispatch(outcome: &'static str) {
    counter!("outdial_dispatch_total", "outcome" => outcome).increment(1);
}

/// Record a session reaching `Ended` or `Failed`
pub fn record_call_finished(state: &'static str, reason: &'static str) {
    counter!("outdial_calls_finished_total", "state" => state, "reason" => reason).increment(1);
}

/// Record a transfer attempt outcome
pub fn record_transfer(outcome: &'static str) {
    counter!("outdial_transfers_total", "outcome" => outcome).increment(1);
}

/// Record how a trunk event was handled
pub fn record_trunk_event(disposition: &'static str) {
    counter!("outdial_trunk_events_total", "disposition" => disposition).increment(1);
}

/// Update the live sessions gauge
pub fn update_active_sessions(count: usize) {
    gauge!("outdial_active_sessions").set(count as f64);
}
