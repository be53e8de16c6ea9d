//! API request and response types

use crate::domain::call::{CallSession, CallState, EndReason};
use crate::domain::transfer::{TransferOutcome, TransferTarget};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope for every API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Request to place an outbound call
#[derive(Debug, Deserialize)]
pub struct DispatchCallRequest {
    /// Free-form input; non-digits are stripped and `+` prefixed
    pub destination_number: String,
    pub correlation_id: Option<String>,
    pub trunk_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferCallRequest {
    /// Omitted means the default transfer number
    #[serde(default)]
    pub target: Option<TransferTarget>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationFailureRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

/// Call session as exposed over the API
#[derive(Debug, Serialize, Deserialize)]
pub struct CallResponse {
    pub correlation_id: String,
    pub destination_number: String,
    pub trunk_id: String,
    pub state: CallState,
    pub end_reason: Option<EndReason>,
    pub failure_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub dialed_at: Option<DateTime<Utc>>,
    pub answered_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub transfer_failures: u32,
    pub last_transfer_target: Option<String>,
    pub last_transfer_error: Option<String>,
    pub state_history: Vec<CallState>,
}

impl From<CallSession> for CallResponse {
    fn from(session: CallSession) -> Self {
        Self {
            correlation_id: session.correlation_id().to_string(),
            destination_number: session.destination_number().to_string(),
            trunk_id: session.trunk_id().to_string(),
            state: session.state(),
            end_reason: session.end_reason(),
            failure_detail: session.failure_detail().map(str::to_string),
            created_at: *session.created_at(),
            dialed_at: session.dialed_at().copied(),
            answered_at: session.answered_at().copied(),
            ended_at: session.ended_at().copied(),
            duration_seconds: session.duration().map(|d| d.num_seconds()),
            transfer_failures: session.transfer_failures(),
            last_transfer_target: session.last_transfer_target().map(|n| n.to_string()),
            last_transfer_error: session.last_transfer_error().map(str::to_string),
            state_history: session.state_history(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallListResponse {
    pub calls: Vec<CallResponse>,
    pub total: usize,
}

impl From<Vec<CallSession>> for CallListResponse {
    fn from(sessions: Vec<CallSession>) -> Self {
        let calls: Vec<CallResponse> = sessions.into_iter().map(Into::into).collect();
        let total = calls.len();
        Self { calls, total }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationFailureResponse {
    /// False when auto-transfer is switched off
    pub auto_transfer: bool,
    pub outcome: Option<TransferOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::value_objects::CorrelationId;

    #[test]
    fn test_error_response_omits_data() {
        let json = serde_json::to_value(ApiResponse::<()>::error("nope".to_string())).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "nope");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_call_response_from_session() {
        let mut session = CallSession::new(
            CorrelationId::new("c1"),
            "+919988776655".to_string(),
            "ST_trunk".to_string(),
        );
        session.begin_dialing().unwrap();

        let json = serde_json::to_value(CallResponse::from(session)).unwrap();
        assert_eq!(json["correlation_id"], "c1");
        assert_eq!(json["state"], "dialing");
        assert_eq!(json["state_history"], serde_json::json!(["created", "dialing"]));
        assert!(json["end_reason"].is_null());
    }

    #[test]
    fn test_transfer_request_defaults() {
        let request: TransferCallRequest = serde_json::from_str("{}").unwrap();
        assert!(request.target.is_none());

        let request: TransferCallRequest =
            serde_json::from_str(r#"{"target":"+15551234567"}"#).unwrap();
        assert_eq!(
            request.target,
            Some(TransferTarget::Number("+15551234567".to_string()))
        );
    }
}
