//! Referral commission engine.
//!
//! Commission flows from a referred user's activation to the referrer's
//! balance. The stored commission record, keyed by referred user id, is
//! the idempotency guard: the existence check and the credit run inside
//! the same lock scope on the referrer's aggregate, so repeating the call
//! can never credit twice.

use crate::error::BusinessResult;
use crate::notify::{Notification, NotificationKind};
use crate::services::ServiceContext;
use panelpay_core::{
    referral, LedgerError, LedgerEvent, LedgerEventKind, ReferralCommission,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// Result of an award attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissionOutcome {
    /// Commission credited to the referrer
    Credited,
    /// A commission for this referred user already exists
    AlreadyAwarded,
    /// The referred user has no referrer
    NoReferrer,
}

/// Affiliate dashboard view for one user.
#[derive(Debug, Clone, Serialize)]
pub struct AffiliateStats {
    pub user_id: String,
    pub referral_code: String,
    pub commission_earned: Decimal,
    pub total_referrals: usize,
    pub referrals: Vec<ReferralCommission>,
}

/// Referral Commission Engine
pub struct ReferralEngine<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReferralEngine<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Credit the referrer of `referred_user_id`, exactly once ever.
    pub async fn award(&self, referred_user_id: &str) -> BusinessResult<CommissionOutcome> {
        let referred = self.ctx.store().load_user(referred_user_id).await?;
        let Some(referrer_id) = referred.referred_by else {
            return Ok(CommissionOutcome::NoReferrer);
        };

        let commission = self.ctx.config().referral_commission;
        let referred_id = referred_user_id.to_string();

        let outcome = self
            .ctx
            .store()
            .with_user(&referrer_id, move |referrer| {
                // Check-then-act must share the lock scope with the credit
                if referrer.has_commission_for(&referred_id) {
                    return Ok(CommissionOutcome::AlreadyAwarded);
                }
                referrer.commissions.insert(
                    referred_id.clone(),
                    ReferralCommission::new(&referred_id, commission),
                );
                referrer.referral_commission_earned += commission;
                referrer.credit(commission);
                Ok(CommissionOutcome::Credited)
            })
            .await?;

        if outcome == CommissionOutcome::Credited {
            self.ctx.record(|id| {
                LedgerEvent::new(
                    id,
                    LedgerEventKind::CommissionCredited,
                    referred_user_id,
                    &referrer_id,
                )
                .with_amount(commission)
            });
            self.ctx.notify(
                Notification::new(&referrer_id, NotificationKind::CommissionCredited)
                    .with_amount(commission),
            );
        }

        Ok(outcome)
    }

    /// Affiliate stats, generating and persisting the referral code on
    /// first read.
    pub async fn affiliate_stats(&self, user_id: &str) -> BusinessResult<AffiliateStats> {
        let code = self
            .ctx
            .store()
            .with_user(user_id, |user| {
                if let Some(code) = &user.referral_code {
                    return Ok(code.clone());
                }
                let code = referral::generate_code();
                user.referral_code = Some(code.clone());
                Ok(code)
            })
            .await?;

        let user = self.ctx.store().load_user(user_id).await?;
        let mut referrals: Vec<ReferralCommission> = user.commissions.values().cloned().collect();
        referrals.sort_by_key(|c| c.created_at);

        Ok(AffiliateStats {
            user_id: user.id,
            referral_code: code,
            commission_earned: user.referral_commission_earned,
            total_referrals: referrals.len(),
            referrals,
        })
    }

    /// Resolve a referral code to its owner. Read-only, no side effects.
    pub async fn verify_code(&self, code: &str) -> BusinessResult<Option<String>> {
        if !referral::is_valid_code(code) {
            return Err(LedgerError::InvalidReferralCode(code.to_string()).into());
        }
        Ok(self.ctx.store().resolve_referral_code(code).await?)
    }
}
