//! Telephony provider adapters

pub mod destination;
pub mod simulated;

pub use destination::{format_transfer_destination, participant_identity};
pub use simulated::{DialBehavior, SimulatedTrunk, TransferBehavior, TransferRecord};
