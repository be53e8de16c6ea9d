//! Call session domain events

use crate::domain::call::value_object::CallState;
use crate::domain::shared::events::{DomainEvent, EventMetadata};
use crate::domain::shared::value_objects::CorrelationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single state change recorded by a call session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub metadata: EventMetadata,
    pub correlation_id: CorrelationId,
    pub from: CallState,
    pub to: CallState,
}

impl StateTransition {
    pub fn new(correlation_id: CorrelationId, from: CallState, to: CallState) -> Self {
        Self {
            metadata: EventMetadata::now(),
            correlation_id,
            from,
            to,
        }
    }
}

impl DomainEvent for StateTransition {
    fn event_type(&self) -> &'static str {
        match self.to {
            CallState::Created => "call.created",
            CallState::Dialing => "call.dialing",
            CallState::Ringing => "call.ringing",
            CallState::Answered => "call.answered",
            CallState::Transferring => "call.transferring",
            CallState::Ended => "call.ended",
            CallState::Failed => "call.failed",
        }
    }

    fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.metadata.occurred_at
    }
}
