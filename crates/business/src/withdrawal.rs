//! Withdrawal ledger - balance validation, reservation and disposition.
//!
//! Funds are reserved (deducted from `total_earned`) when the request is
//! created, not when it is approved. Two concurrent requests therefore
//! cannot both pass the balance check against the same un-decremented
//! balance. Rejection restores the reservation: a rejected request never
//! paid out, so keeping the deduction would let the balance diverge from
//! the sum of authorized mutations.

use crate::error::BusinessResult;
use crate::notify::{Notification, NotificationKind};
use crate::services::ServiceContext;
use chrono::Utc;
use panelpay_core::{
    Actor, LedgerError, LedgerEvent, LedgerEventKind, WithdrawalKind, WithdrawalRequest,
    WithdrawalStatus,
};
use panelpay_persistence::{QueueRepo, WithdrawalQueueRow};
use rust_decimal::Decimal;

/// Withdrawal Ledger
pub struct WithdrawalLedger<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> WithdrawalLedger<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a withdrawal request, reserving the funds in the same
    /// transaction.
    pub async fn request(
        &self,
        user_id: &str,
        phone: &str,
        amount: Decimal,
        kind: WithdrawalKind,
    ) -> BusinessResult<WithdrawalRequest> {
        // Shape checks before any lock is taken
        if phone.trim().is_empty() {
            return Err(LedgerError::InvalidPhone(phone.to_string()).into());
        }
        let config = self.ctx.config();
        if amount < config.min_withdraw || amount > config.max_withdraw {
            return Err(LedgerError::AmountOutOfRange {
                min: config.min_withdraw,
                max: config.max_withdraw,
            }
            .into());
        }

        let total_surveys = config.total_surveys;
        let daily_limit = config.daily_withdraw_limit;

        let request = self
            .ctx
            .store()
            .with_user(user_id, |user| match kind {
                WithdrawalKind::WelcomeBonus => {
                    if user.welcome_bonus_withdrawn {
                        return Err(LedgerError::WelcomeBonusAlreadyWithdrawn);
                    }
                    if !user.is_activated() {
                        return Err(LedgerError::NotActivated);
                    }
                    if amount > user.welcome_bonus {
                        return Err(LedgerError::InsufficientBalance {
                            needed: amount,
                            available: user.welcome_bonus,
                        });
                    }

                    let request =
                        WithdrawalRequest::new(phone, amount, Decimal::ZERO, kind);
                    user.withdrawal_requests
                        .insert(request.id.clone(), request.clone());
                    user.welcome_bonus_withdrawn = true;
                    Ok(request)
                }
                WithdrawalKind::Normal => {
                    if !user.is_activated() {
                        return Err(LedgerError::NotActivated);
                    }
                    if user.total_surveys_completed() < total_surveys as u32 {
                        return Err(LedgerError::NotEnoughSurveys(total_surveys));
                    }
                    if user.processing_withdrawal().is_some() {
                        return Err(LedgerError::WithdrawalInProgress);
                    }
                    let today = Utc::now().date_naive();
                    if user.withdrawals_created_on(today) >= daily_limit {
                        return Err(LedgerError::DailyLimitReached(daily_limit));
                    }

                    // Withdrawal needs an activated plan; its tier sets the fee
                    let plan = user.best_activated_plan().ok_or(LedgerError::NotActivated)?;
                    let fee = plan.withdraw_fee();
                    if amount <= fee {
                        return Err(LedgerError::InvalidAmount(format!(
                            "amount {} does not cover the fee {}",
                            amount, fee
                        )));
                    }

                    // Reserve now - this closes the double-spend window
                    user.debit(amount)?;

                    let request = WithdrawalRequest::new(phone, amount, fee, kind);
                    user.withdrawal_requests
                        .insert(request.id.clone(), request.clone());
                    Ok(request)
                }
            })
            .await?;

        self.ctx.record(|id| {
            LedgerEvent::new(id, LedgerEventKind::WithdrawalRequested, user_id, user_id)
                .with_amount(request.amount)
                .with_request(&request.id)
        });
        self.ctx.notify(
            Notification::new(user_id, NotificationKind::WithdrawalRequested)
                .with_amount(request.net_amount)
                .with_request(&request.id),
        );

        Ok(request)
    }

    /// Approve a processing request. No balance mutation - the funds were
    /// reserved at request time.
    pub async fn approve(
        &self,
        actor: &Actor,
        request_id: &str,
    ) -> BusinessResult<WithdrawalRequest> {
        if !actor.is_admin() {
            return Err(LedgerError::AdminRequired("withdrawal approval".to_string()).into());
        }
        let user_id = self.owner_of(request_id).await?;

        let request = self
            .ctx
            .store()
            .with_user(&user_id, |user| {
                let request = user
                    .withdrawal_requests
                    .get_mut(request_id)
                    .ok_or_else(|| LedgerError::RequestNotFound(request_id.to_string()))?;
                if request.status != WithdrawalStatus::Processing {
                    return Err(LedgerError::AlreadyProcessed(request_id.to_string()));
                }
                request.status = WithdrawalStatus::Approved;
                request.processed_at = Some(Utc::now());
                Ok(request.clone())
            })
            .await?;

        self.ctx.record(|id| {
            LedgerEvent::new(id, LedgerEventKind::WithdrawalApproved, &actor.id, &user_id)
                .with_amount(request.amount)
                .with_request(&request.id)
        });
        self.ctx.notify(
            Notification::new(&user_id, NotificationKind::WithdrawalApproved)
                .with_amount(request.net_amount)
                .with_request(&request.id),
        );

        Ok(request)
    }

    /// Reject a processing request and restore the reservation.
    pub async fn reject(
        &self,
        actor: &Actor,
        request_id: &str,
    ) -> BusinessResult<WithdrawalRequest> {
        if !actor.is_admin() {
            return Err(LedgerError::AdminRequired("withdrawal rejection".to_string()).into());
        }
        let user_id = self.owner_of(request_id).await?;

        let request = self
            .ctx
            .store()
            .with_user(&user_id, |user| {
                let request = user
                    .withdrawal_requests
                    .get_mut(request_id)
                    .ok_or_else(|| LedgerError::RequestNotFound(request_id.to_string()))?;
                if request.status != WithdrawalStatus::Processing {
                    return Err(LedgerError::AlreadyProcessed(request_id.to_string()));
                }
                request.status = WithdrawalStatus::Rejected;
                request.processed_at = Some(Utc::now());
                let snapshot = request.clone();

                // Restore the reservation taken at request time
                match snapshot.kind {
                    WithdrawalKind::Normal => user.credit(snapshot.amount),
                    WithdrawalKind::WelcomeBonus => user.welcome_bonus_withdrawn = false,
                }
                Ok(snapshot)
            })
            .await?;

        self.ctx.record(|id| {
            LedgerEvent::new(id, LedgerEventKind::WithdrawalRejected, &actor.id, &user_id)
                .with_amount(request.amount)
                .with_request(&request.id)
        });
        self.ctx.notify(
            Notification::new(&user_id, NotificationKind::WithdrawalRejected)
                .with_amount(request.amount)
                .with_request(&request.id),
        );

        Ok(request)
    }

    /// All processing requests joined with user identity, newest first
    pub async fn pending(&self) -> BusinessResult<Vec<WithdrawalQueueRow>> {
        let mut conn = self.ctx.store().acquire().await?;
        Ok(QueueRepo::pending_withdrawals(&mut conn).await?)
    }

    /// Every request, newest first
    pub async fn all(&self) -> BusinessResult<Vec<WithdrawalQueueRow>> {
        let mut conn = self.ctx.store().acquire().await?;
        Ok(QueueRepo::all_withdrawals(&mut conn).await?)
    }

    /// Resolve which user owns the request before taking their lock
    async fn owner_of(&self, request_id: &str) -> BusinessResult<String> {
        let mut conn = self.ctx.store().acquire().await?;
        QueueRepo::withdrawal_owner(&mut conn, request_id)
            .await?
            .ok_or_else(|| LedgerError::RequestNotFound(request_id.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationWorkflow;
    use crate::notify::RecordingNotifier;
    use crate::progress::ProgressTracker;
    use crate::registration::RegistrationService;
    use panelpay_core::{LedgerConfig, Plan};
    use panelpay_persistence::{create_schema, JournalStore, LedgerStore};
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn test_ctx() -> (ServiceContext, Arc<RecordingNotifier>, tempfile::TempDir) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        let dir = tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = ServiceContext::from_parts(
            Arc::new(LedgerStore::new(pool)),
            Arc::new(JournalStore::new(dir.path()).unwrap()),
            notifier.clone(),
            LedgerConfig::default(),
        );
        (ctx, notifier, dir)
    }

    /// Register, complete and activate a REGULAR plan; balance is 1500.
    async fn activated_user(ctx: &ServiceContext) -> String {
        let user_id = RegistrationService::new(ctx)
            .register("Alice", "0712345678", None, None)
            .await
            .unwrap()
            .id;
        let tracker = ProgressTracker::new(ctx);
        tracker.select_plan(&user_id, Plan::Regular).await.unwrap();
        for _ in 0..10 {
            tracker
                .complete_survey(&user_id, Plan::Regular)
                .await
                .unwrap();
        }
        let workflow = ActivationWorkflow::new(ctx);
        let request = workflow
            .submit(&user_id, Plan::Regular, "MPESA-REF1")
            .await
            .unwrap();
        workflow
            .approve(&Actor::admin("OPS-1"), &user_id, &request.id)
            .await
            .unwrap();
        user_id
    }

    #[tokio::test]
    async fn test_amount_bounds_checked_before_lock() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = activated_user(&ctx).await;
        let ledger = WithdrawalLedger::new(&ctx);

        let err = ledger
            .request(&user_id, "0712345678", dec!(100), WithdrawalKind::Normal)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = ledger
            .request(&user_id, "0712345678", dec!(600000), WithdrawalKind::Normal)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(LedgerError::AmountOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_normal_withdrawal_reserves_funds() {
        let (ctx, notifier, _dir) = test_ctx().await;
        let user_id = activated_user(&ctx).await;
        let ledger = WithdrawalLedger::new(&ctx);

        let request = ledger
            .request(&user_id, "0712345678", dec!(1500), WithdrawalKind::Normal)
            .await
            .unwrap();
        assert_eq!(request.fee, dec!(10));
        assert_eq!(request.net_amount, dec!(1490));
        assert_eq!(request.status, WithdrawalStatus::Processing);

        // Reserved at request time, not at approval
        let user = ctx.store().load_user(&user_id).await.unwrap();
        assert_eq!(user.total_earned, dec!(0));

        let approved = ledger
            .approve(&Actor::admin("OPS-1"), &request.id)
            .await
            .unwrap();
        assert_eq!(approved.status, WithdrawalStatus::Approved);

        // Approval does not touch the balance again
        let user = ctx.store().load_user(&user_id).await.unwrap();
        assert_eq!(user.total_earned, dec!(0));
        assert_eq!(notifier.count_of(NotificationKind::WithdrawalApproved), 1);
    }

    #[tokio::test]
    async fn test_requires_activation() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = RegistrationService::new(&ctx)
            .register("Bob", "0798765432", None, None)
            .await
            .unwrap()
            .id;
        let ledger = WithdrawalLedger::new(&ctx);

        let err = ledger
            .request(&user_id, "0798765432", dec!(200), WithdrawalKind::Normal)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(LedgerError::NotActivated)));

        let err = ledger
            .request(&user_id, "0798765432", dec!(200), WithdrawalKind::WelcomeBonus)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(LedgerError::NotActivated)));
    }

    #[tokio::test]
    async fn test_single_in_flight_request() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = activated_user(&ctx).await;
        let ledger = WithdrawalLedger::new(&ctx);

        ledger
            .request(&user_id, "0712345678", dec!(500), WithdrawalKind::Normal)
            .await
            .unwrap();
        let err = ledger
            .request(&user_id, "0712345678", dec!(500), WithdrawalKind::Normal)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(LedgerError::WithdrawalInProgress)
        ));
    }

    #[tokio::test]
    async fn test_daily_cap_counts_disposed_requests() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = activated_user(&ctx).await;
        let ledger = WithdrawalLedger::new(&ctx);

        let first = ledger
            .request(&user_id, "0712345678", dec!(500), WithdrawalKind::Normal)
            .await
            .unwrap();
        ledger
            .approve(&Actor::admin("OPS-1"), &first.id)
            .await
            .unwrap();

        // Nothing in flight any more, balance is ample - the calendar-day
        // cap alone rejects the second request
        let err = ledger
            .request(&user_id, "0712345678", dec!(500), WithdrawalKind::Normal)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(LedgerError::DailyLimitReached(1))
        ));
        assert!(err.is_rate_limit());
    }

    #[tokio::test]
    async fn test_insufficient_balance() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = activated_user(&ctx).await;
        let ledger = WithdrawalLedger::new(&ctx);

        let err = ledger
            .request(&user_id, "0712345678", dec!(2000), WithdrawalKind::Normal)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(LedgerError::InsufficientBalance { .. })
        ));

        // The failed request reserved nothing
        let user = ctx.store().load_user(&user_id).await.unwrap();
        assert_eq!(user.total_earned, dec!(1500));
        assert!(user.withdrawal_requests.is_empty());
    }

    #[tokio::test]
    async fn test_reject_refunds_reservation() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = activated_user(&ctx).await;
        let ledger = WithdrawalLedger::new(&ctx);

        let request = ledger
            .request(&user_id, "0712345678", dec!(1000), WithdrawalKind::Normal)
            .await
            .unwrap();
        let user = ctx.store().load_user(&user_id).await.unwrap();
        assert_eq!(user.total_earned, dec!(500));

        let rejected = ledger
            .reject(&Actor::admin("OPS-1"), &request.id)
            .await
            .unwrap();
        assert_eq!(rejected.status, WithdrawalStatus::Rejected);

        // The reservation is restored in full
        let user = ctx.store().load_user(&user_id).await.unwrap();
        assert_eq!(user.total_earned, dec!(1500));

        // Disposing twice conflicts
        let err = ledger
            .reject(&Actor::admin("OPS-1"), &request.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(LedgerError::AlreadyProcessed(_))
        ));
    }

    #[tokio::test]
    async fn test_welcome_bonus_is_one_shot() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = activated_user(&ctx).await;
        let ledger = WithdrawalLedger::new(&ctx);

        let request = ledger
            .request(&user_id, "0712345678", dec!(250), WithdrawalKind::WelcomeBonus)
            .await
            .unwrap();
        assert_eq!(request.fee, dec!(0));
        assert_eq!(request.net_amount, dec!(250));

        // total_earned is untouched; only the flag flips
        let user = ctx.store().load_user(&user_id).await.unwrap();
        assert_eq!(user.total_earned, dec!(1500));
        assert!(user.welcome_bonus_withdrawn);

        let err = ledger
            .request(&user_id, "0712345678", dec!(250), WithdrawalKind::WelcomeBonus)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(LedgerError::WelcomeBonusAlreadyWithdrawn)
        ));
    }

    #[tokio::test]
    async fn test_welcome_bonus_reject_restores_flag() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = activated_user(&ctx).await;
        let ledger = WithdrawalLedger::new(&ctx);

        let request = ledger
            .request(&user_id, "0712345678", dec!(250), WithdrawalKind::WelcomeBonus)
            .await
            .unwrap();
        ledger
            .reject(&Actor::admin("OPS-1"), &request.id)
            .await
            .unwrap();

        let user = ctx.store().load_user(&user_id).await.unwrap();
        assert!(!user.welcome_bonus_withdrawn);
    }

    #[tokio::test]
    async fn test_admin_required_for_disposition() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = activated_user(&ctx).await;
        let ledger = WithdrawalLedger::new(&ctx);
        let request = ledger
            .request(&user_id, "0712345678", dec!(500), WithdrawalKind::Normal)
            .await
            .unwrap();

        let err = ledger
            .approve(&Actor::user(&user_id), &request.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(LedgerError::AdminRequired(_))
        ));
    }

    #[tokio::test]
    async fn test_pending_queue_joined_with_identity() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = activated_user(&ctx).await;
        let ledger = WithdrawalLedger::new(&ctx);
        ledger
            .request(&user_id, "0799000111", dec!(500), WithdrawalKind::Normal)
            .await
            .unwrap();

        let queue = ledger.pending().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].name, "Alice");
        // The payout number from the request, not the profile phone
        assert_eq!(queue[0].phone, "0799000111");

        let err = ledger
            .approve(&Actor::admin("OPS-1"), "WDR-MISSING")
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(LedgerError::RequestNotFound(_))
        ));
    }
}
