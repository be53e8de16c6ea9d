//! Outdial - outbound call lifecycle orchestrator
//!
//! Places outbound calls through a SIP trunk, tracks each call through its
//! lifecycle and transfers answered calls to a human on request or when the
//! automated conversation fails.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::error::Result;
