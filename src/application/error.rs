//! Application errors

use crate::domain::call::CallState;
use crate::domain::shared::value_objects::CorrelationId;
use thiserror::Error;

/// Dispatch rejections
///
/// A gated dispatch is not an error: it yields a session in `Failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("a live session already exists for correlation id {0}")]
    DuplicateCorrelationId(CorrelationId),

    #[error("invalid dispatch request: {0}")]
    InvalidRequest(String),

    #[error("orchestrator is shutting down")]
    ShuttingDown,
}

/// Transfer contract violations; the call itself is unaffected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("no live session for correlation id {0}")]
    SessionNotFound(CorrelationId),

    #[error("cannot transfer call {correlation_id} in state {state}")]
    InvalidState {
        correlation_id: CorrelationId,
        state: CallState,
    },

    #[error("invalid transfer target: {0}")]
    InvalidTarget(String),

    #[error("a transfer is already in progress for {0}")]
    TransferInProgress(CorrelationId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("session not found: {0}")]
pub struct SessionNotFound(pub CorrelationId);
