//! Domain-level error types.

use thiserror::Error;
use uuid::Uuid;

use crate::ports::RateLimitError;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: Uuid },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Storage unavailable: {0}")]
    Connection(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Internal failure inside the admission gate.
///
/// Never surfaced to clients. The HTTP layer maps every variant to
/// "allowed" (fail-open).
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Counter store failed: {0}")]
    Store(#[from] RateLimitError),
}
