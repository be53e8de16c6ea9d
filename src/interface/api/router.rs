//! API Router configuration

use super::calls_handler::{
    call_history, conversation_failure, dispatch_call, get_call, hangup_call, health_check,
    list_calls, record_activity, transfer_call,
};
use super::metrics_handler::metrics_handler;
use super::trunk_handler::receive_trunk_event;
use super::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn build_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    let health_routes = Router::new().route("/health", get(health_check));

    // Call management routes
    let call_routes = Router::new()
        .route("/calls", post(dispatch_call).get(list_calls))
        .route("/calls/history", get(call_history))
        .route("/calls/:id", get(get_call))
        .route("/calls/:id/hangup", post(hangup_call))
        .route("/calls/:id/transfer", post(transfer_call))
        .route("/calls/:id/activity", post(record_activity))
        .route("/calls/:id/conversation-failure", post(conversation_failure));

    // Provider webhooks
    let trunk_routes = Router::new().route("/trunk/events", post(receive_trunk_event));

    // Metrics route (separate state)
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    Router::new()
        .merge(health_routes)
        .merge(call_routes)
        .merge(trunk_routes)
        .with_state(state)
        .merge(metrics_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
