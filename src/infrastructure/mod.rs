//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Telephony provider adapters behind the `SipTrunkClient` port
//! - Prometheus metrics

pub mod metrics;
pub mod trunk;
