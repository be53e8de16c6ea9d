//! Transfer intents and outcomes

use crate::domain::shared::value_objects::CorrelationId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Where a transfer should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferTarget {
    /// The configured default transfer number
    Default,
    /// An explicit number, validated before use
    Number(String),
}

impl TransferTarget {
    pub fn parse(target: &str) -> Self {
        if target.trim().eq_ignore_ascii_case("default") {
            TransferTarget::Default
        } else {
            TransferTarget::Number(target.trim().to_string())
        }
    }
}

impl Serialize for TransferTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TransferTarget::Default => serializer.serialize_str("default"),
            TransferTarget::Number(number) => serializer.serialize_str(number),
        }
    }
}

impl<'de> Deserialize<'de> for TransferTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TransferTarget::parse(&raw))
    }
}

/// Transfer request produced by the conversational layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub correlation_id: CorrelationId,
    pub target: TransferTarget,
}

impl TransferIntent {
    pub fn new(correlation_id: CorrelationId, target: TransferTarget) -> Self {
        Self {
            correlation_id,
            target,
        }
    }

    pub fn to_default(correlation_id: CorrelationId) -> Self {
        Self::new(correlation_id, TransferTarget::Default)
    }
}

/// Result of a transfer that was accepted and attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Call handed off to the target
    Transferred { target: String },
    /// Transfer did not happen; `call_active` tells whether the original call continues
    Failed { reason: String, call_active: bool },
}

impl TransferOutcome {
    pub fn is_transferred(&self) -> bool {
        matches!(self, TransferOutcome::Transferred { .. })
    }
}
