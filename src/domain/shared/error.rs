//! Domain errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),
}

/// Result of a domain operation
pub type Result<T> = std::result::Result<T, DomainError>;
