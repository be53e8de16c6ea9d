//! Domain layer - Core business logic and rules
//!
//! This layer contains:
//! - Aggregates: the call session and its state machine
//! - Value Objects: phone numbers, correlation ids, dial handles
//! - Policies: the dial gate
//! - Ports: the SIP trunk client trait implemented by provider adapters
//! - Domain Events: recorded state transitions

pub mod call;
pub mod dial_gate;
pub mod dispatch;
pub mod shared;
pub mod transfer;
pub mod trunk;

// Re-export commonly used types
pub use shared::{DomainError, Result};
