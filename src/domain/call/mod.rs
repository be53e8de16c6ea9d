//! Call bounded context - lifecycle of a single outbound call attempt

pub mod aggregate;
pub mod event;
pub mod value_object;

pub use aggregate::{CallSession, EventDisposition};
pub use event::StateTransition;
pub use value_object::{CallState, EndReason};
