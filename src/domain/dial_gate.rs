//! Dial gate - safety policy evaluated before any trunk resource is touched

use crate::domain::shared::value_objects::PhoneNumber;
use serde::{Deserialize, Serialize};

pub const REASON_DISABLED: &str = "outbound calling disabled by safety toggle";
pub const REASON_INVALID_NUMBER: &str = "invalid destination number";
pub const REASON_ALLOWED: &str = "allowed";

/// Outcome of a gate evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialGateDecision {
    pub allowed: bool,
    pub reason: String,
}

impl DialGateDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: REASON_ALLOWED.to_string(),
        }
    }

    fn reject(reason: &str) -> Self {
        Self {
            allowed: false,
            reason: reason.to_string(),
        }
    }
}

/// Dial gate
pub struct DialGate;

impl DialGate {
    /// Decide whether a destination may be dialed
    ///
    /// The safety toggle is checked before the number so a disabled gate
    /// never looks at caller input.
    pub fn evaluate(enable_outbound_calls: bool, destination_number: &str) -> DialGateDecision {
        if !enable_outbound_calls {
            return DialGateDecision::reject(REASON_DISABLED);
        }

        if !PhoneNumber::is_valid(destination_number) {
            return DialGateDecision::reject(REASON_INVALID_NUMBER);
        }

        DialGateDecision::allow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_allows_valid_number() {
        let decision = DialGate::evaluate(true, "+919988776655");
        assert!(decision.allowed);
        assert_eq!(decision.reason, REASON_ALLOWED);
    }

    #[test]
    fn test_gate_disabled_short_circuits() {
        let decision = DialGate::evaluate(false, "+919988776655");
        assert!(!decision.allowed);
        assert_eq!(decision.reason, REASON_DISABLED);

        // Disabled wins over an invalid number
        let decision = DialGate::evaluate(false, "not-a-number");
        assert_eq!(decision.reason, REASON_DISABLED);
    }

    #[test]
    fn test_gate_rejects_invalid_numbers() {
        for number in ["", "+", "919988776655", "+91-998877", "+1234567", "+1234567890123456", "+0919988776655"] {
            let decision = DialGate::evaluate(true, number);
            assert!(!decision.allowed, "{} should be rejected", number);
            assert_eq!(decision.reason, REASON_INVALID_NUMBER);
        }
    }
}
