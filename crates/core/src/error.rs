//! # Error Module
//!
//! Domain errors for the rewards ledger, using thiserror.
//!
//! Every variant carries a stable, human-readable reason so a client can
//! tell "not yet eligible" from "already processed" from "server error".

use crate::plan::Plan;
use rust_decimal::Decimal;
use thiserror::Error;

/// Core ledger errors.
///
/// Raised inside lock-scoped mutations; any of these aborts the whole
/// transaction, so no partial state is ever visible.
#[derive(Debug, Error)]
pub enum LedgerError {
    // === Validation errors (rejected before any lock is taken) ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount must be between {min} and {max}")]
    AmountOutOfRange { min: Decimal, max: Decimal },

    #[error("Invalid referral code: {0}")]
    InvalidReferralCode(String),

    #[error("Payment reference must not be empty")]
    InvalidPaymentReference,

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    // === Conflict errors (precondition violated under lock) ===
    #[error("Surveys not complete for plan {0}")]
    SurveysNotComplete(Plan),

    #[error("At least {0} completed surveys required")]
    NotEnoughSurveys(u8),

    #[error("Plan {0} is already activated")]
    AlreadyActivated(Plan),

    #[error("Activation for plan {0} already submitted and pending")]
    ActivationPending(Plan),

    #[error("Account is not activated")]
    NotActivated,

    #[error("A withdrawal is already processing")]
    WithdrawalInProgress,

    #[error("Welcome bonus already withdrawn")]
    WelcomeBonusAlreadyWithdrawn,

    #[error("Request {0} already processed")]
    AlreadyProcessed(String),

    #[error("Insufficient balance: need {needed}, available {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    // === Not found errors ===
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Request not found: {0}")]
    RequestNotFound(String),

    #[error("Plan {0} not selected")]
    PlanNotSelected(Plan),

    // === Authorization errors ===
    #[error("Admin role required for {0}")]
    AdminRequired(String),

    // === Rate limit errors ===
    #[error("Daily withdrawal limit of {0} reached")]
    DailyLimitReached(usize),
}

/// Result type alias with LedgerError
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// Input rejected before any state was read
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAmount(_)
                | LedgerError::AmountOutOfRange { .. }
                | LedgerError::InvalidReferralCode(_)
                | LedgerError::InvalidPaymentReference
                | LedgerError::InvalidPhone(_)
        )
    }

    /// Precondition violated against current state
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            LedgerError::SurveysNotComplete(_)
                | LedgerError::NotEnoughSurveys(_)
                | LedgerError::AlreadyActivated(_)
                | LedgerError::ActivationPending(_)
                | LedgerError::NotActivated
                | LedgerError::WithdrawalInProgress
                | LedgerError::WelcomeBonusAlreadyWithdrawn
                | LedgerError::AlreadyProcessed(_)
                | LedgerError::InsufficientBalance { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::UserNotFound(_)
                | LedgerError::RequestNotFound(_)
                | LedgerError::PlanNotSelected(_)
        )
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LedgerError::DailyLimitReached(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_display() {
        let err = LedgerError::InsufficientBalance {
            needed: dec!(1500),
            available: dec!(500),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance: need 1500, available 500"
        );

        let err = LedgerError::ActivationPending(Plan::Regular);
        assert_eq!(
            err.to_string(),
            "Activation for plan regular already submitted and pending"
        );
    }

    #[test]
    fn test_error_classes() {
        assert!(LedgerError::AmountOutOfRange {
            min: dec!(200),
            max: dec!(500000),
        }
        .is_validation());

        assert!(LedgerError::AlreadyActivated(Plan::Vip).is_conflict());
        assert!(LedgerError::UserNotFound("USR-1".into()).is_not_found());
        assert!(LedgerError::DailyLimitReached(1).is_rate_limit());
        assert!(!LedgerError::DailyLimitReached(1).is_conflict());
    }
}
