//! Activation request workflow.
//!
//! State machine per (user, plan): Submitted -> Approved | Rejected.
//! Submission records a claimed out-of-band payment; approval re-validates
//! every precondition under the lock, because state may have changed since
//! submission. Approval of a referred user triggers the referral engine as
//! a second, independent lock-scoped mutation.

use crate::error::BusinessResult;
use crate::notify::{Notification, NotificationKind};
use crate::referral::ReferralEngine;
use crate::services::ServiceContext;
use chrono::Utc;
use panelpay_core::{
    ActivationRequest, ActivationStatus, Actor, LedgerError, LedgerEvent, LedgerEventKind, Plan,
};
use panelpay_persistence::{ActivationQueueRow, QueueRepo};

/// Activation Request Workflow
pub struct ActivationWorkflow<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ActivationWorkflow<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Submit an activation claim for a completed plan.
    ///
    /// Fails with a stable reason when the surveys are not complete, the
    /// plan is already activated, or a claim is already pending.
    pub async fn submit(
        &self,
        user_id: &str,
        plan: Plan,
        payment_reference: &str,
    ) -> BusinessResult<ActivationRequest> {
        if payment_reference.trim().is_empty() {
            return Err(LedgerError::InvalidPaymentReference.into());
        }

        let request = self
            .ctx
            .store()
            .with_user(user_id, |user| {
                let progress = user
                    .plans
                    .get(&plan)
                    .ok_or(LedgerError::SurveysNotComplete(plan))?;
                if !progress.completed {
                    return Err(LedgerError::SurveysNotComplete(plan));
                }
                if progress.is_activated {
                    return Err(LedgerError::AlreadyActivated(plan));
                }
                if user.pending_activation(plan).is_some() {
                    return Err(LedgerError::ActivationPending(plan));
                }

                let request = ActivationRequest::new(plan, payment_reference);
                user.activation_requests
                    .insert(request.id.clone(), request.clone());
                Ok(request)
            })
            .await?;

        self.ctx.record(|id| {
            LedgerEvent::new(id, LedgerEventKind::ActivationSubmitted, user_id, user_id)
                .with_plan(plan)
                .with_amount(request.amount)
                .with_request(&request.id)
        });
        self.ctx.notify(
            Notification::new(user_id, NotificationKind::ActivationSubmitted)
                .with_plan(plan)
                .with_request(&request.id),
        );

        Ok(request)
    }

    /// Approve a submitted request after verifying the payment.
    ///
    /// Preconditions are re-validated against current state under the
    /// lock. The activation commit is the primary effect; the referral
    /// commission runs afterwards against the referrer's aggregate and is
    /// best-effort (idempotent, safe to retry on a later re-approval
    /// attempt).
    pub async fn approve(
        &self,
        actor: &Actor,
        user_id: &str,
        request_id: &str,
    ) -> BusinessResult<ActivationRequest> {
        if !actor.is_admin() {
            return Err(LedgerError::AdminRequired("activation approval".to_string()).into());
        }

        let (request, referred_by) = self
            .ctx
            .store()
            .with_user(user_id, |user| {
                let request = user
                    .activation_requests
                    .get(request_id)
                    .ok_or_else(|| LedgerError::RequestNotFound(request_id.to_string()))?;
                if request.status != ActivationStatus::Submitted {
                    return Err(LedgerError::AlreadyProcessed(request_id.to_string()));
                }
                let plan = request.plan;

                // State may have moved since submission
                let progress = user
                    .plans
                    .get(&plan)
                    .ok_or(LedgerError::SurveysNotComplete(plan))?;
                if !progress.completed {
                    return Err(LedgerError::SurveysNotComplete(plan));
                }
                if progress.is_activated {
                    return Err(LedgerError::AlreadyActivated(plan));
                }

                let now = Utc::now();
                let request = user
                    .activation_requests
                    .get_mut(request_id)
                    .ok_or_else(|| LedgerError::RequestNotFound(request_id.to_string()))?;
                request.status = ActivationStatus::Approved;
                request.processed_at = Some(now);
                let snapshot = request.clone();

                let progress = user
                    .plans
                    .get_mut(&plan)
                    .ok_or(LedgerError::SurveysNotComplete(plan))?;
                progress.is_activated = true;
                progress.activated_at = Some(now);

                Ok((snapshot, user.referred_by.clone()))
            })
            .await?;

        self.ctx.record(|id| {
            LedgerEvent::new(id, LedgerEventKind::ActivationApproved, &actor.id, user_id)
                .with_plan(request.plan)
                .with_request(&request.id)
        });
        self.ctx.notify(
            Notification::new(user_id, NotificationKind::ActivationApproved)
                .with_plan(request.plan)
                .with_request(&request.id),
        );

        // Second lock scope, never rolled back into the activation
        if referred_by.is_some() {
            let engine = ReferralEngine::new(self.ctx);
            if let Err(err) = engine.award(user_id).await {
                tracing::warn!(%err, user_id, "referral commission failed; safe to retry");
            }
        }

        Ok(request)
    }

    /// Reject a submitted request. No balance effect: the fee was paid
    /// out-of-band and the ledger never held it.
    pub async fn reject(
        &self,
        actor: &Actor,
        user_id: &str,
        request_id: &str,
    ) -> BusinessResult<ActivationRequest> {
        if !actor.is_admin() {
            return Err(LedgerError::AdminRequired("activation rejection".to_string()).into());
        }

        let request = self
            .ctx
            .store()
            .with_user(user_id, |user| {
                let request = user
                    .activation_requests
                    .get_mut(request_id)
                    .ok_or_else(|| LedgerError::RequestNotFound(request_id.to_string()))?;
                if request.status != ActivationStatus::Submitted {
                    return Err(LedgerError::AlreadyProcessed(request_id.to_string()));
                }
                request.status = ActivationStatus::Rejected;
                request.processed_at = Some(Utc::now());
                Ok(request.clone())
            })
            .await?;

        self.ctx.record(|id| {
            LedgerEvent::new(id, LedgerEventKind::ActivationRejected, &actor.id, user_id)
                .with_plan(request.plan)
                .with_request(&request.id)
        });
        self.ctx.notify(
            Notification::new(user_id, NotificationKind::ActivationRejected)
                .with_plan(request.plan)
                .with_request(&request.id),
        );

        Ok(request)
    }

    /// All submitted requests across users, oldest first (FIFO queue)
    pub async fn pending(&self) -> BusinessResult<Vec<ActivationQueueRow>> {
        let mut conn = self.ctx.store().acquire().await?;
        Ok(QueueRepo::pending_activations(&mut conn).await?)
    }

    /// Every request, newest first
    pub async fn all(&self) -> BusinessResult<Vec<ActivationQueueRow>> {
        let mut conn = self.ctx.store().acquire().await?;
        Ok(QueueRepo::all_activations(&mut conn).await?)
    }
}
