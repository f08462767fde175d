//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Recoverable conditions (`NotFound`, `Validation`, `InsufficientStock`,
/// `WrongKey`) are surfaced for the caller to render. `CompositionCycle`,
/// `NotComponent`, `NotBoxedSet` and `MissingVariantRow` indicate corrupt
/// catalog data at the point of detection. `Store` wraps an infrastructure
/// failure after the enclosing transaction has been rolled back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A requested record is absent.
    #[error("{0} not found")]
    NotFound(String),

    /// A value failed validation (e.g. malformed input, illegal transition).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A vault entry was read with a key that does not match the record.
    #[error("decryption key does not match this record")]
    WrongKey,

    /// An order line asked for more stock than the catalog currently holds.
    #[error("insufficient stock for {product_code}: requested {requested}, available {available}")]
    InsufficientStock {
        product_code: String,
        requested: u32,
        available: u32,
    },

    /// A boxed-set content graph revisited a product code during expansion.
    #[error("boxed-set contents of {0} form a cycle")]
    CompositionCycle(String),

    /// A component operation was attempted on a non-component code.
    #[error("product {0} is not a component")]
    NotComponent(String),

    /// A boxed-set operation was attempted on a non-boxed-set code.
    #[error("product {0} is not a boxed set")]
    NotBoxedSet(String),

    /// The product row exists but its variant row is missing.
    #[error("component row missing for product {0}")]
    MissingVariantRow(String),

    /// Underlying store failure (already rolled back when surfaced).
    #[error("store error: {0}")]
    Store(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
