//! User registration - creates the aggregate the ledger operates on.
//!
//! Authentication lives outside the core; registration only builds the
//! user record, grants the welcome bonus and resolves an optional referral
//! code to a `referred_by` back-reference.

use crate::error::BusinessResult;
use crate::services::ServiceContext;
use panelpay_core::{referral, LedgerError, LedgerEvent, LedgerEventKind, User};

/// Registration service
pub struct RegistrationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RegistrationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a new user. An invalid or unknown referral code rejects the
    /// registration rather than silently dropping the attribution.
    pub async fn register(
        &self,
        name: &str,
        phone: &str,
        email: Option<&str>,
        referral_code: Option<&str>,
    ) -> BusinessResult<User> {
        if phone.trim().is_empty() {
            return Err(LedgerError::InvalidPhone(phone.to_string()).into());
        }

        let referred_by = match referral_code {
            Some(code) => {
                if !referral::is_valid_code(code) {
                    return Err(LedgerError::InvalidReferralCode(code.to_string()).into());
                }
                let owner = self
                    .ctx
                    .store()
                    .resolve_referral_code(code)
                    .await?
                    .ok_or_else(|| LedgerError::InvalidReferralCode(code.to_string()))?;
                Some(owner)
            }
            None => None,
        };

        let mut user = User::new(name, phone, self.ctx.config().welcome_bonus);
        if let Some(email) = email {
            user = user.with_email(email);
        }
        if let Some(referrer_id) = &referred_by {
            user = user.with_referrer(referrer_id);
        }

        self.ctx.store().insert_user(&user).await?;

        self.ctx.record(|id| {
            LedgerEvent::new(id, LedgerEventKind::UserRegistered, &user.id, &user.id)
        });
        tracing::info!(user_id = %user.id, referred = referred_by.is_some(), "user registered");

        Ok(user)
    }
}
