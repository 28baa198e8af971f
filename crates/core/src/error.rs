//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// One product that could not cover a requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub requested: i64,
    pub available: i64,
}

impl core::fmt::Display for StockShortfall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "product {} (requested {}, available {})",
            self.product_id, self.requested, self.available
        )
    }
}

/// Domain-level error.
///
/// Every variant is scoped to the request that produced it: nothing here is
/// fatal to the process, and an operation that returns an error has left no
/// partial state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (empty notes, zero quantity, empty order, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Availability check failed for one or more products.
    #[error("insufficient stock: {}", format_shortfalls(.0))]
    InsufficientStock(Vec<StockShortfall>),

    /// Referential-integrity violation or a lost race; safe to retry after re-reading.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A domain invariant was violated (e.g. an illegal status transition).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The storage layer failed (e.g. a poisoned lock).
    #[error("storage failure: {0}")]
    Storage(String),
}

fn format_shortfalls(shortfalls: &[StockShortfall]) -> String {
    shortfalls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Shorthand for mapping a poisoned lock into a storage error.
    pub fn poisoned(what: &str) -> Self {
        Self::Storage(format!("{what} lock poisoned"))
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::NotFound { .. } => "not_found",
            DomainError::InsufficientStock(_) => "insufficient_stock",
            DomainError::Conflict(_) => "conflict",
            DomainError::InvariantViolation(_) => "invariant_violation",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::Storage(_) => "storage_error",
        }
    }

    /// Whether the caller may retry the same request after re-reading state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Conflict(_) | DomainError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_lists_every_product() {
        let a = ProductId::new();
        let b = ProductId::new();
        let err = DomainError::InsufficientStock(vec![
            StockShortfall {
                product_id: a,
                requested: 5,
                available: 3,
            },
            StockShortfall {
                product_id: b,
                requested: 2,
                available: 0,
            },
        ]);

        let msg = err.to_string();
        assert!(msg.contains(&a.to_string()));
        assert!(msg.contains(&b.to_string()));
        assert!(msg.contains("requested 5, available 3"));
        assert_eq!(err.code(), "insufficient_stock");
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = DomainError::not_found("customer", "42");
        assert_eq!(err.to_string(), "customer not found: 42");
        assert!(!err.is_retryable());
    }

    #[test]
    fn conflicts_are_retryable() {
        assert!(DomainError::conflict("lost race").is_retryable());
        assert!(DomainError::poisoned("ledger").is_retryable());
        assert!(!DomainError::validation("bad").is_retryable());
    }
}
