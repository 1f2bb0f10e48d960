//! # User Module
//!
//! The `User` root aggregate. It exclusively owns its plan progress map,
//! activation requests, withdrawal requests and referral commissions; the
//! only cross-aggregate relation is `referred_by`, a lookup-only
//! back-reference that never mutates the other user directly.
//!
//! Sub-entities are held in collections keyed by stable id, so lookups are
//! O(1) and a mutation is "replace the entry at that key" inside the same
//! lock scope.

use crate::error::{LedgerError, LedgerResult};
use crate::plan::Plan;
use crate::request::{
    ActivationRequest, ReferralCommission, WithdrawalRequest, WithdrawalStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Per-plan survey progress. Counters never decrement; `completed` and
/// `is_activated` flip false -> true exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanProgress {
    pub plan: Plan,
    pub surveys_completed: u8,
    pub completed: bool,
    pub is_activated: bool,
    pub activated_at: Option<DateTime<Utc>>,
}

impl PlanProgress {
    /// Fresh entry created on first plan selection
    pub fn new(plan: Plan) -> Self {
        Self {
            plan,
            surveys_completed: 0,
            completed: false,
            is_activated: false,
            activated_at: None,
        }
    }

    /// Completed but still awaiting activation
    pub fn awaiting_activation(&self) -> bool {
        self.completed && !self.is_activated
    }
}

/// A panel member's full ledger state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// ID of the user (USR-XXXXXXXX)
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    /// Mobile-money number used for payouts
    pub phone: String,
    /// Withdrawable balance; every mutation goes through credit/debit
    pub total_earned: Decimal,
    /// One-shot bonus granted at registration
    pub welcome_bonus: Decimal,
    pub welcome_bonus_withdrawn: bool,
    /// Lookup-only back-reference to the inviting user
    pub referred_by: Option<String>,
    /// Lazily generated 8-char affiliate code
    pub referral_code: Option<String>,
    pub referral_commission_earned: Decimal,
    /// Progress per selected plan
    pub plans: HashMap<Plan, PlanProgress>,
    /// Activation requests keyed by request id
    pub activation_requests: HashMap<String, ActivationRequest>,
    /// Withdrawal requests keyed by request id
    pub withdrawal_requests: HashMap<String, WithdrawalRequest>,
    /// Commissions keyed by referred user id - the idempotency guard
    pub commissions: HashMap<String, ReferralCommission>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// New user with a fresh id and the given welcome bonus grant
    pub fn new(name: &str, phone: &str, welcome_bonus: Decimal) -> Self {
        Self {
            id: crate::request::new_id("USR"),
            name: name.to_string(),
            email: None,
            phone: phone.to_string(),
            total_earned: Decimal::ZERO,
            welcome_bonus,
            welcome_bonus_withdrawn: false,
            referred_by: None,
            referral_code: None,
            referral_commission_earned: Decimal::ZERO,
            plans: HashMap::new(),
            activation_requests: HashMap::new(),
            withdrawal_requests: HashMap::new(),
            commissions: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_referrer(mut self, referrer_id: &str) -> Self {
        self.referred_by = Some(referrer_id.to_string());
        self
    }

    // === Balance ===

    /// Add to the withdrawable balance
    pub fn credit(&mut self, amount: Decimal) {
        self.total_earned += amount;
    }

    /// Subtract from the withdrawable balance; fails rather than going
    /// negative
    pub fn debit(&mut self, amount: Decimal) -> LedgerResult<()> {
        if self.total_earned < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: self.total_earned,
            });
        }
        self.total_earned -= amount;
        Ok(())
    }

    // === Derived activation state ===

    /// Whether any plan is activated. Derived from the per-plan flags so
    /// there is no second source of truth to drift.
    pub fn is_activated(&self) -> bool {
        self.plans.values().any(|p| p.is_activated)
    }

    /// Highest activated tier, which carries the withdrawal fee to apply
    pub fn best_activated_plan(&self) -> Option<Plan> {
        self.plans
            .values()
            .filter(|p| p.is_activated)
            .map(|p| p.plan)
            .max_by_key(|p| p.rank())
    }

    // === Progress views ===

    /// Sum of survey counters across all plans
    pub fn total_surveys_completed(&self) -> u32 {
        self.plans
            .values()
            .map(|p| p.surveys_completed as u32)
            .sum()
    }

    /// First plan that is completed but not yet activated, lowest tier
    /// first
    pub fn active_plan(&self) -> Option<Plan> {
        Plan::all()
            .into_iter()
            .find(|plan| {
                self.plans
                    .get(plan)
                    .map_or(false, |p| p.awaiting_activation())
            })
    }

    // === Request views ===

    /// Pending activation request for a plan, if any
    pub fn pending_activation(&self, plan: Plan) -> Option<&ActivationRequest> {
        self.activation_requests
            .values()
            .find(|r| r.plan == plan && r.is_pending())
    }

    /// The in-flight withdrawal, if any
    pub fn processing_withdrawal(&self) -> Option<&WithdrawalRequest> {
        self.withdrawal_requests
            .values()
            .find(|r| r.status == WithdrawalStatus::Processing)
    }

    /// Withdrawal requests created on the given UTC calendar day,
    /// whatever their later disposition
    pub fn withdrawals_created_on(&self, day: NaiveDate) -> usize {
        self.withdrawal_requests
            .values()
            .filter(|r| r.created_at.date_naive() == day)
            .count()
    }

    /// Whether a commission for this referred user was already credited
    pub fn has_commission_for(&self, referred_user_id: &str) -> bool {
        self.commissions.contains_key(referred_user_id)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User {} ({}, balance: {}, activated: {})",
            self.id,
            self.name,
            self.total_earned,
            self.is_activated()
        )
    }
}
