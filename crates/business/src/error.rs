//! Business layer errors
//!
//! Domain errors pass through transparently so callers (and tests) can
//! still classify "not yet eligible" vs "already processed"; everything
//! else is an internal storage failure.

use panelpay_core::LedgerError;
use panelpay_persistence::StoreError;
use thiserror::Error;

/// Business operation errors
#[derive(Debug, Error)]
pub enum BusinessError {
    /// A precondition or validation failed; safe to show to the user
    #[error(transparent)]
    Domain(LedgerError),

    /// Storage or transaction failure; the mutation was rolled back
    #[error("Internal error: {0}")]
    Internal(StoreError),
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;

impl From<LedgerError> for BusinessError {
    fn from(err: LedgerError) -> Self {
        BusinessError::Domain(err)
    }
}

impl From<StoreError> for BusinessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(domain) => BusinessError::Domain(domain),
            other => BusinessError::Internal(other),
        }
    }
}

impl BusinessError {
    /// The domain error inside, if any
    pub fn as_domain(&self) -> Option<&LedgerError> {
        match self {
            BusinessError::Domain(e) => Some(e),
            BusinessError::Internal(_) => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.as_domain().map_or(false, |e| e.is_conflict())
    }

    pub fn is_validation(&self) -> bool {
        self.as_domain().map_or(false, |e| e.is_validation())
    }

    pub fn is_rate_limit(&self) -> bool {
        self.as_domain().map_or(false, |e| e.is_rate_limit())
    }

    pub fn is_not_found(&self) -> bool {
        self.as_domain().map_or(false, |e| e.is_not_found())
    }
}
