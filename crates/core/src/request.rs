//! # Request Module
//!
//! Owned sub-entities of the `User` aggregate: activation requests,
//! withdrawal requests and referral commissions. Each carries a stable id
//! so the aggregate can hold them in keyed collections and mutate by key.

use crate::plan::Plan;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Short prefixed id, e.g. `ACT-9F3A1B2C`.
pub fn new_id(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        Uuid::new_v4().to_string()[..8].to_uppercase()
    )
}

/// Status of an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationStatus {
    /// Awaiting operator verification of the payment reference
    Submitted,
    /// Operator confirmed the payment; plan unlocked
    Approved,
    /// Operator could not verify the payment
    Rejected,
}

impl ActivationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationStatus::Submitted => "submitted",
            ActivationStatus::Approved => "approved",
            ActivationStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "submitted" => Some(ActivationStatus::Submitted),
            "approved" => Some(ActivationStatus::Approved),
            "rejected" => Some(ActivationStatus::Rejected),
            _ => None,
        }
    }
}

/// A claim that the activation fee for a plan was paid out-of-band.
///
/// The ledger never holds these funds; it records the operator's verdict on
/// the claimed payment reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub id: String,
    pub plan: Plan,
    /// Opaque mobile-money transaction code, verified by the operator
    pub payment_reference: String,
    /// Fixed activation fee for the plan at submission time
    pub amount: Decimal,
    pub status: ActivationStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl ActivationRequest {
    pub fn new(plan: Plan, payment_reference: &str) -> Self {
        Self {
            id: new_id("ACT"),
            plan,
            payment_reference: payment_reference.to_string(),
            amount: plan.activation_fee(),
            status: ActivationStatus::Submitted,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ActivationStatus::Submitted
    }
}

/// Kind of withdrawal: the regular earnings flow or the one-shot bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalKind {
    Normal,
    WelcomeBonus,
}

impl WithdrawalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalKind::Normal => "normal",
            WithdrawalKind::WelcomeBonus => "welcome_bonus",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(WithdrawalKind::Normal),
            "welcome_bonus" => Some(WithdrawalKind::WelcomeBonus),
            _ => None,
        }
    }
}

/// Status of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    /// Funds reserved, payout instruction queued for the operator
    Processing,
    /// Operator confirmed the payout
    Approved,
    /// Operator declined; the reservation is restored
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(WithdrawalStatus::Processing),
            "approved" => Some(WithdrawalStatus::Approved),
            "rejected" => Some(WithdrawalStatus::Rejected),
            _ => None,
        }
    }
}

/// A queued payout instruction. Funds are reserved at request time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: String,
    /// Mobile-money number the payout goes to
    pub phone: String,
    /// Gross amount deducted from the balance
    pub amount: Decimal,
    pub fee: Decimal,
    /// amount - fee, what the operator actually sends
    pub net_amount: Decimal,
    pub kind: WithdrawalKind,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl WithdrawalRequest {
    pub fn new(phone: &str, amount: Decimal, fee: Decimal, kind: WithdrawalKind) -> Self {
        Self {
            id: new_id("WDR"),
            phone: phone.to_string(),
            amount,
            fee,
            net_amount: amount - fee,
            kind,
            status: WithdrawalStatus::Processing,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.status == WithdrawalStatus::Processing
    }
}

/// Commission credited to a referrer when a referred user activates.
///
/// Keyed by the referred user's id; at most one record per referred user
/// ever exists - this is the idempotency guard against double commission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralCommission {
    pub referred_user_id: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl ReferralCommission {
    pub fn new(referred_user_id: &str, amount: Decimal) -> Self {
        Self {
            referred_user_id: referred_user_id.to_string(),
            amount,
            created_at: Utc::now(),
        }
    }
}
