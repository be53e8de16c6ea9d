//! Provider webhook ingress

use super::dto::ApiResponse;
use super::AppState;
use crate::domain::trunk::TrunkEvent;
use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, error};

/// Queue a provider event for the event router
pub async fn receive_trunk_event(
    State(state): State<AppState>,
    Json(event): Json<TrunkEvent>,
) -> (StatusCode, Json<ApiResponse<&'static str>>) {
    debug!(
        "API: Trunk event {:?} for call {}",
        event.kind, event.correlation_id
    );

    match state.trunk_events.send(event).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(ApiResponse::success("queued"))),
        Err(_) => {
            error!("API: Trunk event channel closed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::error("event router not running".to_string())),
            )
        }
    }
}
