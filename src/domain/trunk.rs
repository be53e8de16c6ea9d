//! SIP trunk port
//!
//! The telephony provider lives outside this crate. The orchestrator talks to
//! it through [`SipTrunkClient`] for commands and consumes [`TrunkEvent`]s for
//! everything the provider reports asynchronously.

use crate::domain::call::EndReason;
use crate::domain::shared::value_objects::{CorrelationId, PhoneNumber};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Provider-side handle for a dialed call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialHandle(String);

impl DialHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DialHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of event reported by the trunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrunkEventKind {
    Ringing,
    Answered,
    Busy,
    NoAnswer,
    Rejected,
    TrunkError,
    Ended,
    TransferCompleted,
    TransferFailed,
}

impl TrunkEventKind {
    /// Transfer completions are routed to the waiting transfer, not the state machine
    pub fn is_transfer_result(&self) -> bool {
        matches!(
            self,
            TrunkEventKind::TransferCompleted | TrunkEventKind::TransferFailed
        )
    }
}

/// Event reported by the trunk for one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrunkEvent {
    pub correlation_id: CorrelationId,
    #[serde(rename = "event_type")]
    pub kind: TrunkEventKind,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TrunkEvent {
    pub fn new(correlation_id: CorrelationId, kind: TrunkEventKind) -> Self {
        Self {
            correlation_id,
            kind,
            timestamp: Utc::now(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Trunk command failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrunkError {
    #[error("destination busy")]
    Busy,

    #[error("no answer")]
    NoAnswer,

    #[error("call rejected: {0}")]
    Rejected(String),

    #[error("target unreachable: {0}")]
    Unreachable(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("unknown dial handle: {0}")]
    UnknownHandle(String),
}

impl TrunkError {
    /// Terminal reason for a dial that failed with this error
    pub fn end_reason(&self) -> EndReason {
        match self {
            TrunkError::Busy => EndReason::Busy,
            TrunkError::NoAnswer => EndReason::NoAnswer,
            TrunkError::Rejected(_) => EndReason::Rejected,
            TrunkError::Unreachable(_) | TrunkError::Provider(_) | TrunkError::UnknownHandle(_) => {
                EndReason::TrunkError
            }
        }
    }
}

/// Commands issued to the telephony provider
///
/// Every method is a network round trip; callers must not hold a session
/// lock while awaiting them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SipTrunkClient: Send + Sync {
    /// Place an outbound call
    async fn dial(
        &self,
        trunk_id: &str,
        destination: &PhoneNumber,
        correlation_id: &CorrelationId,
    ) -> Result<DialHandle, TrunkError>;

    /// Ask the provider to transfer the far end; completion arrives as an event
    async fn transfer(&self, handle: &DialHandle, target: &PhoneNumber) -> Result<(), TrunkError>;

    /// Tear the call down
    async fn hangup(&self, handle: &DialHandle) -> Result<(), TrunkError>;
}
