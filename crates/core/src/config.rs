//! Ledger-wide scalar limits and grants.
//!
//! Plan-dependent tables live on `Plan`; everything that applies across
//! plans is collected here so no limit is duplicated at call sites.

use rust_decimal::Decimal;

/// Fixed limits and grants for the rewards ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Surveys per plan before the batch completes
    pub total_surveys: u8,

    /// Minimum gross withdrawal amount
    pub min_withdraw: Decimal,

    /// Maximum gross withdrawal amount
    pub max_withdraw: Decimal,

    /// Withdrawal requests a user may create per UTC calendar day
    pub daily_withdraw_limit: usize,

    /// Commission credited to the referrer on a referred user's activation
    pub referral_commission: Decimal,

    /// One-shot bonus granted at registration
    pub welcome_bonus: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            total_surveys: 10,
            min_withdraw: Decimal::new(200, 0),
            max_withdraw: Decimal::new(500_000, 0),
            daily_withdraw_limit: 1,
            referral_commission: Decimal::new(50, 0),
            welcome_bonus: Decimal::new(250, 0),
        }
    }
}
