//! Call session value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// Call session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    /// Session accepted, nothing sent to the trunk yet
    Created,
    /// Dial command issued to the trunk
    Dialing,
    /// Far end is being alerted
    Ringing,
    /// Far end picked up
    Answered,
    /// Transfer command in flight
    Transferring,
    /// Call finished after being dialed
    Ended,
    /// Call never got anywhere, or was torn down by shutdown
    Failed,
}

impl CallState {
    /// Check if state transition is valid
    pub fn can_transition_to(&self, new_state: &CallState) -> bool {
        use CallState::*;

        match (self, new_state) {
            // From Created
            (Created, Dialing) => true,
            (Created, Failed) => true,
            (Created, Ended) => true,

            // From Dialing (answer without a ring event is accepted)
            (Dialing, Ringing) => true,
            (Dialing, Answered) => true,
            (Dialing, Failed) => true,
            (Dialing, Ended) => true,

            // From Ringing
            (Ringing, Answered) => true,
            (Ringing, Failed) => true,
            (Ringing, Ended) => true,

            // From Answered (Failed only through shutdown)
            (Answered, Transferring) => true,
            (Answered, Ended) => true,
            (Answered, Failed) => true,

            // From Transferring
            (Transferring, Answered) => true,
            (Transferring, Ended) => true,
            (Transferring, Failed) => true,

            // Terminal states are absorbing
            (Ended, _) | (Failed, _) => false,

            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Ended | CallState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Created => "created",
            CallState::Dialing => "dialing",
            CallState::Ringing => "ringing",
            CallState::Answered => "answered",
            CallState::Transferring => "transferring",
            CallState::Ended => "ended",
            CallState::Failed => "failed",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason a session reached a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    Busy,
    NoAnswer,
    TrunkError,
    Rejected,
    Transferred,
    Completed,
    /// Explicit hangup command
    Hangup,
    /// Dial gate refused the request
    Gated,
    Shutdown,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Busy => "busy",
            EndReason::NoAnswer => "no-answer",
            EndReason::TrunkError => "trunk-error",
            EndReason::Rejected => "rejected",
            EndReason::Transferred => "transferred",
            EndReason::Completed => "completed",
            EndReason::Hangup => "hangup",
            EndReason::Gated => "gated",
            EndReason::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CallState; 7] = [
        CallState::Created,
        CallState::Dialing,
        CallState::Ringing,
        CallState::Answered,
        CallState::Transferring,
        CallState::Ended,
        CallState::Failed,
    ];

    #[test]
    fn test_valid_state_transitions() {
        assert!(CallState::Created.can_transition_to(&CallState::Dialing));
        assert!(CallState::Dialing.can_transition_to(&CallState::Ringing));
        assert!(CallState::Ringing.can_transition_to(&CallState::Answered));
        assert!(CallState::Answered.can_transition_to(&CallState::Transferring));
        assert!(CallState::Transferring.can_transition_to(&CallState::Answered));
        assert!(CallState::Transferring.can_transition_to(&CallState::Ended));
        assert!(CallState::Ringing.can_transition_to(&CallState::Failed));
    }

    #[test]
    fn test_invalid_state_transitions() {
        assert!(!CallState::Created.can_transition_to(&CallState::Answered));
        assert!(!CallState::Ringing.can_transition_to(&CallState::Dialing));
        assert!(!CallState::Answered.can_transition_to(&CallState::Ringing));
        assert!(!CallState::Ringing.can_transition_to(&CallState::Transferring));
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        for terminal in [CallState::Ended, CallState::Failed] {
            for next in ALL {
                assert!(!terminal.can_transition_to(&next));
            }
        }
    }

    #[test]
    fn test_end_reason_wire_names() {
        assert_eq!(serde_json::to_string(&EndReason::NoAnswer).unwrap(), "\"no-answer\"");
        assert_eq!(serde_json::to_string(&EndReason::TrunkError).unwrap(), "\"trunk-error\"");
        assert_eq!(EndReason::Transferred.to_string(), "transferred");
        assert_eq!(serde_json::to_string(&CallState::Transferring).unwrap(), "\"transferring\"");
    }
}
