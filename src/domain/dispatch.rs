//! Dispatch requests

use crate::domain::shared::value_objects::CorrelationId;
use serde::{Deserialize, Serialize};

/// Request to place one outbound call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialRequest {
    pub correlation_id: CorrelationId,
    /// Expected in E.164 form; anything else is refused by the dial gate
    pub destination_number: String,
    pub trunk_id: String,
}

impl DialRequest {
    pub fn new(
        correlation_id: CorrelationId,
        destination_number: impl Into<String>,
        trunk_id: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id,
            destination_number: destination_number.into(),
            trunk_id: trunk_id.into(),
        }
    }
}
