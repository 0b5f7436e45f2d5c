//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every fallible operation in the system resolves to one of these variants
/// at its boundary; none of them should ever crash the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or empty submission (missing fields, empty line list,
    /// non-positive quantity). Raised before anything is persisted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced request or item does not exist.
    #[error("not found")]
    NotFound,

    /// The actor does not own the resource they are trying to mutate.
    #[error("forbidden")]
    Forbidden,

    /// An attempted transition out of a non-submitted state
    /// (double-approve, cancel-after-decision, ...).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The named item lacks enough available stock to satisfy its line.
    /// Carries the item's display name for the caller to show verbatim.
    #[error("insufficient stock for {item}")]
    InsufficientStock { item: String },

    /// The backing store rejected a read or write. Not specialized further.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn forbidden() -> Self {
        Self::Forbidden
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn insufficient_stock(item: impl Into<String>) -> Self {
        Self::InsufficientStock { item: item.into() }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
