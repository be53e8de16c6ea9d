//! Interface layer - External interfaces
//!
//! This layer handles:
//! - REST API endpoints for dispatch, status and transfer
//! - Provider webhook ingress
//! - Request/response formatting

pub mod api;
