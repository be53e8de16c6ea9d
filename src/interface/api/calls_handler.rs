//! Call management API handlers

use super::dto::{
    ApiResponse, CallListResponse, CallResponse, ConversationFailureRequest,
    ConversationFailureResponse, DispatchCallRequest, HistoryQuery, TransferCallRequest,
};
use super::AppState;
use crate::application::{DispatchError, SessionNotFound, TransferError};
use crate::domain::dispatch::DialRequest;
use crate::domain::shared::value_objects::{CorrelationId, PhoneNumber};
use crate::domain::transfer::{TransferIntent, TransferOutcome, TransferTarget};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info, warn};

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(status: StatusCode, data: T) -> ApiResult<T> {
    (status, Json(ApiResponse::success(data)))
}

fn fail<T>(status: StatusCode, message: String) -> ApiResult<T> {
    (status, Json(ApiResponse::error(message)))
}

fn not_found<T>(e: SessionNotFound) -> ApiResult<T> {
    fail(StatusCode::NOT_FOUND, e.to_string())
}

fn transfer_status(e: &TransferError) -> StatusCode {
    match e {
        TransferError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        TransferError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
        TransferError::InvalidState { .. } | TransferError::TransferInProgress(_) => {
            StatusCode::CONFLICT
        }
    }
}

/// Place an outbound call
pub async fn dispatch_call(
    State(state): State<AppState>,
    Json(req): Json<DispatchCallRequest>,
) -> ApiResult<CallResponse> {
    let normalized = PhoneNumber::normalize(&req.destination_number);
    let destination = if normalized.is_empty() {
        req.destination_number.clone()
    } else {
        normalized
    };
    let correlation_id = req
        .correlation_id
        .map(CorrelationId::new)
        .unwrap_or_else(|| CorrelationId::generate(&destination));

    info!("API: Dispatching call {} to {}", correlation_id, destination);

    let request = DialRequest::new(correlation_id, destination, req.trunk_id.unwrap_or_default());
    match state.orchestrator.dispatch(request).await {
        Ok(session) => ok(StatusCode::CREATED, session.into()),
        Err(e) => {
            warn!("API: Dispatch rejected: {}", e);
            let status = match e {
                DispatchError::DuplicateCorrelationId(_) => StatusCode::CONFLICT,
                DispatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                DispatchError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            };
            fail(status, e.to_string())
        }
    }
}

/// List live calls
pub async fn list_calls(State(state): State<AppState>) -> ApiResult<CallListResponse> {
    ok(StatusCode::OK, state.orchestrator.live_sessions().await.into())
}

/// Most recent finished calls, newest first
pub async fn call_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<CallListResponse> {
    ok(
        StatusCode::OK,
        state.orchestrator.recent_history(query.limit).await.into(),
    )
}

/// Get a call by correlation id
pub async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CallResponse> {
    match state.orchestrator.status(&CorrelationId::new(id)).await {
        Ok(session) => ok(StatusCode::OK, session.into()),
        Err(e) => not_found(e),
    }
}

/// Hang up a call
pub async fn hangup_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CallResponse> {
    info!("API: Hanging up call {}", id);

    match state.orchestrator.hangup(&CorrelationId::new(id)).await {
        Ok(session) => ok(StatusCode::OK, session.into()),
        Err(e) => not_found(e),
    }
}

/// Transfer an answered call
pub async fn transfer_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<TransferCallRequest>>,
) -> ApiResult<TransferOutcome> {
    let target = body
        .and_then(|Json(req)| req.target)
        .unwrap_or(TransferTarget::Default);
    info!("API: Transfer requested for call {} ({:?})", id, target);

    let intent = TransferIntent::new(CorrelationId::new(id), target);
    match state.orchestrator.on_transfer_intent(intent).await {
        Ok(outcome) => ok(StatusCode::OK, outcome),
        Err(e) => {
            warn!("API: Transfer refused: {}", e);
            fail(transfer_status(&e), e.to_string())
        }
    }
}

/// Record that someone spoke on the call
pub async fn record_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<&'static str> {
    match state.orchestrator.record_activity(&CorrelationId::new(id)).await {
        Ok(()) => ok(StatusCode::OK, "OK"),
        Err(e) => not_found(e),
    }
}

/// Report a conversation failure, triggering auto-transfer when enabled
pub async fn conversation_failure(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ConversationFailureRequest>,
) -> ApiResult<ConversationFailureResponse> {
    error!("API: Conversation failure on call {}: {}", id, req.reason);

    match state
        .orchestrator
        .on_conversation_failure(CorrelationId::new(id), &req.reason)
        .await
    {
        Ok(outcome) => ok(
            StatusCode::OK,
            ConversationFailureResponse {
                auto_transfer: outcome.is_some(),
                outcome,
            },
        ),
        Err(e) => fail(transfer_status(&e), e.to_string()),
    }
}

/// Health check
pub async fn health_check() -> ApiResult<&'static str> {
    ok(StatusCode::OK, "OK")
}
