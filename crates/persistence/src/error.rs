//! # Persistence Errors
//!
//! Error types for the persistence layer, wrapping sqlx and IO errors.
//! Domain errors raised inside a lock-scoped mutation pass through
//! transparently so callers can still classify them.

use panelpay_core::LedgerError;
use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    // === Domain errors surfaced from inside a transaction ===
    #[error(transparent)]
    Domain(#[from] LedgerError),

    // === Database errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity} with id {id}")]
    AlreadyExists { entity: String, id: String },

    // === Journal errors ===
    #[error("Journal IO error: {0}")]
    JournalIo(#[from] std::io::Error),

    #[error("Journal serialization error: {0}")]
    JournalSerialization(#[from] serde_json::Error),

    // === Conversion errors ===
    #[error("Invalid decimal value: {0}")]
    InvalidDecimal(String),

    #[error("Invalid enum value: {field} = {value}")]
    InvalidEnumValue { field: String, value: String },
}

/// Result type alias for StoreError
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &str, id: &str) -> Self {
        Self::AlreadyExists {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_enum(field: &str, value: &str) -> Self {
        Self::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The domain error inside, if this is one
    pub fn as_domain(&self) -> Option<&LedgerError> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}
