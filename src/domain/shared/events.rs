//! Domain event plumbing

use super::value_objects::CorrelationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Something that happened to a call, keyed by its correlation id
pub trait DomainEvent: Send + Sync {
    /// Dotted name, e.g. `call.answered`
    fn event_type(&self) -> &'static str;

    fn correlation_id(&self) -> &CorrelationId;

    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Identity and timestamp carried by every recorded event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Stamp an event happening now
    pub fn now() -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        }
    }
}
