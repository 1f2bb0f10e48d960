//! Database schema definitions
//!
//! Row types for sqlx mapping from SQLite tables, plus conversions to and
//! from the domain aggregate. Decimals are stored as TEXT; parsing back is
//! fallible and surfaces as `StoreError::InvalidDecimal`.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use panelpay_core::{
    ActivationRequest, ActivationStatus, Plan, PlanProgress, ReferralCommission, User,
    WithdrawalKind, WithdrawalRequest, WithdrawalStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub(crate) fn parse_decimal(value: &str) -> StoreResult<Decimal> {
    Decimal::from_str(value).map_err(|_| StoreError::InvalidDecimal(value.to_string()))
}

pub(crate) fn parse_plan(value: &str) -> StoreResult<Plan> {
    Plan::from_str(value).ok_or_else(|| StoreError::invalid_enum("plan", value))
}

/// Row type for the `users` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub total_earned: String,
    pub welcome_bonus: String,
    pub welcome_bonus_withdrawn: bool,
    pub referred_by: Option<String>,
    pub referral_code: Option<String>,
    pub referral_commission_earned: String,
    pub created_at: DateTime<Utc>,
}

/// Row type for the `plan_progress` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PlanProgressRow {
    pub user_id: String,
    pub plan: String,
    pub surveys_completed: i64,
    pub completed: bool,
    pub is_activated: bool,
    pub activated_at: Option<DateTime<Utc>>,
}

/// Row type for the `activation_requests` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ActivationRequestRow {
    pub id: String,
    pub user_id: String,
    pub plan: String,
    pub payment_reference: String,
    pub amount: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Row type for the `withdrawal_requests` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct WithdrawalRequestRow {
    pub id: String,
    pub user_id: String,
    pub phone: String,
    pub amount: String,
    pub fee: String,
    pub net_amount: String,
    pub kind: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Row type for the `referral_commissions` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ReferralCommissionRow {
    pub referrer_id: String,
    pub referred_user_id: String,
    pub amount: String,
    pub created_at: DateTime<Utc>,
}

/// Activation request joined with user identity for the operator queue
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ActivationQueueRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub user_phone: String,
    pub plan: String,
    pub payment_reference: String,
    pub amount: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Withdrawal request joined with user identity for the operator queue
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct WithdrawalQueueRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    /// Payout number given on the request
    pub phone: String,
    pub amount: String,
    pub fee: String,
    pub net_amount: String,
    pub kind: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

// === Conversion implementations ===

impl TryFrom<PlanProgressRow> for PlanProgress {
    type Error = StoreError;

    fn try_from(row: PlanProgressRow) -> StoreResult<Self> {
        Ok(PlanProgress {
            plan: parse_plan(&row.plan)?,
            surveys_completed: row.surveys_completed as u8,
            completed: row.completed,
            is_activated: row.is_activated,
            activated_at: row.activated_at,
        })
    }
}

impl TryFrom<ActivationRequestRow> for ActivationRequest {
    type Error = StoreError;

    fn try_from(row: ActivationRequestRow) -> StoreResult<Self> {
        Ok(ActivationRequest {
            id: row.id,
            plan: parse_plan(&row.plan)?,
            payment_reference: row.payment_reference,
            amount: parse_decimal(&row.amount)?,
            status: ActivationStatus::from_str(&row.status)
                .ok_or_else(|| StoreError::invalid_enum("activation status", &row.status))?,
            created_at: row.created_at,
            processed_at: row.processed_at,
        })
    }
}

impl TryFrom<WithdrawalRequestRow> for WithdrawalRequest {
    type Error = StoreError;

    fn try_from(row: WithdrawalRequestRow) -> StoreResult<Self> {
        Ok(WithdrawalRequest {
            id: row.id,
            phone: row.phone,
            amount: parse_decimal(&row.amount)?,
            fee: parse_decimal(&row.fee)?,
            net_amount: parse_decimal(&row.net_amount)?,
            kind: WithdrawalKind::from_str(&row.kind)
                .ok_or_else(|| StoreError::invalid_enum("withdrawal kind", &row.kind))?,
            status: WithdrawalStatus::from_str(&row.status)
                .ok_or_else(|| StoreError::invalid_enum("withdrawal status", &row.status))?,
            created_at: row.created_at,
            processed_at: row.processed_at,
        })
    }
}

impl TryFrom<ReferralCommissionRow> for ReferralCommission {
    type Error = StoreError;

    fn try_from(row: ReferralCommissionRow) -> StoreResult<Self> {
        Ok(ReferralCommission {
            referred_user_id: row.referred_user_id,
            amount: parse_decimal(&row.amount)?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    /// Builds the aggregate shell; the repo fills the owned collections.
    fn try_from(row: UserRow) -> StoreResult<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            total_earned: parse_decimal(&row.total_earned)?,
            welcome_bonus: parse_decimal(&row.welcome_bonus)?,
            welcome_bonus_withdrawn: row.welcome_bonus_withdrawn,
            referred_by: row.referred_by,
            referral_code: row.referral_code,
            referral_commission_earned: parse_decimal(&row.referral_commission_earned)?,
            plans: Default::default(),
            activation_requests: Default::default(),
            withdrawal_requests: Default::default(),
            commissions: Default::default(),
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1490").unwrap(), dec!(1490));
        assert!(parse_decimal("not-a-number").is_err());
    }

    #[test]
    fn test_plan_progress_row_conversion() {
        let row = PlanProgressRow {
            user_id: "USR-AB12CD34".into(),
            plan: "regular".into(),
            surveys_completed: 10,
            completed: true,
            is_activated: false,
            activated_at: None,
        };
        let progress = PlanProgress::try_from(row).unwrap();
        assert_eq!(progress.plan, Plan::Regular);
        assert_eq!(progress.surveys_completed, 10);
        assert!(progress.awaiting_activation());
    }

    #[test]
    fn test_bad_enum_value_rejected() {
        let row = PlanProgressRow {
            user_id: "USR-AB12CD34".into(),
            plan: "platinum".into(),
            surveys_completed: 0,
            completed: false,
            is_activated: false,
            activated_at: None,
        };
        let err = PlanProgress::try_from(row).unwrap_err();
        assert!(matches!(err, StoreError::InvalidEnumValue { .. }));
    }
}
