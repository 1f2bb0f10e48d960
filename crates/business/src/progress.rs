//! Plan progress tracking - survey increments and the one-time completion
//! credit.

use crate::error::BusinessResult;
use crate::notify::{Notification, NotificationKind};
use crate::services::ServiceContext;
use panelpay_core::{LedgerError, LedgerEvent, LedgerEventKind, Plan, PlanProgress};
use serde::Serialize;

/// Read-only aggregate view across all plans.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub user_id: String,
    /// Per-plan progress, lowest tier first
    pub plans: Vec<PlanProgress>,
    pub total_surveys_completed: u32,
    /// First plan that is completed but not yet activated
    pub active_plan: Option<Plan>,
}

/// Plan Progress Tracker
pub struct ProgressTracker<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create the progress entry for `plan` if absent. Idempotent:
    /// re-selecting an existing plan is a no-op.
    pub async fn select_plan(&self, user_id: &str, plan: Plan) -> BusinessResult<PlanProgress> {
        let (progress, created) = self
            .ctx
            .store()
            .with_user(user_id, |user| {
                if let Some(existing) = user.plans.get(&plan) {
                    return Ok((existing.clone(), false));
                }
                let fresh = PlanProgress::new(plan);
                user.plans.insert(plan, fresh.clone());
                Ok((fresh, true))
            })
            .await?;

        if created {
            self.ctx.record(|id| {
                LedgerEvent::new(id, LedgerEventKind::PlanSelected, user_id, user_id)
                    .with_plan(plan)
            });
        }
        Ok(progress)
    }

    /// Record one survey completion for `plan`.
    ///
    /// Crossing the threshold pins the counter, flips `completed` and
    /// credits the plan's total earning - all in the same transaction.
    /// Calling again after completion is a no-op returning the current
    /// state: it never re-increments and never re-credits.
    pub async fn complete_survey(&self, user_id: &str, plan: Plan) -> BusinessResult<PlanProgress> {
        let total_surveys = self.ctx.config().total_surveys;

        let (progress, incremented, crossed) = self
            .ctx
            .store()
            .with_user(user_id, |user| {
                let entry = user
                    .plans
                    .get_mut(&plan)
                    .ok_or(LedgerError::PlanNotSelected(plan))?;

                if entry.completed {
                    // No-op: never re-increment, never re-credit
                    return Ok((entry.clone(), false, false));
                }

                entry.surveys_completed += 1;
                let crossed = entry.surveys_completed >= total_surveys;
                if crossed {
                    entry.surveys_completed = total_surveys;
                    entry.completed = true;
                }
                let snapshot = entry.clone();

                if crossed {
                    user.credit(plan.total_earning());
                }
                Ok((snapshot, true, crossed))
            })
            .await?;

        if incremented {
            self.ctx.record(|id| {
                LedgerEvent::new(id, LedgerEventKind::SurveyCompleted, user_id, user_id)
                    .with_plan(plan)
            });
        }

        if crossed {
            self.ctx.record(|id| {
                LedgerEvent::new(id, LedgerEventKind::PlanCompleted, user_id, user_id)
                    .with_plan(plan)
                    .with_amount(plan.total_earning())
            });
            self.ctx.notify(
                Notification::new(user_id, NotificationKind::PlanCompleted)
                    .with_plan(plan)
                    .with_amount(plan.total_earning()),
            );
        }

        Ok(progress)
    }

    /// Read-only progress view across all plans
    pub async fn progress(&self, user_id: &str) -> BusinessResult<ProgressView> {
        let user = self.ctx.store().load_user(user_id).await?;

        let mut plans: Vec<PlanProgress> = user.plans.values().cloned().collect();
        plans.sort_by_key(|p| p.plan.rank());

        Ok(ProgressView {
            user_id: user.id.clone(),
            total_surveys_completed: user.total_surveys_completed(),
            active_plan: user.active_plan(),
            plans,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::registration::RegistrationService;
    use panelpay_core::LedgerConfig;
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

    async fn register(ctx: &ServiceContext) -> String {
        RegistrationService::new(ctx)
            .register("Alice", "0712345678", None, None)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_select_plan_is_idempotent() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = register(&ctx).await;
        let tracker = ProgressTracker::new(&ctx);

        let first = tracker.select_plan(&user_id, Plan::Regular).await.unwrap();
        assert_eq!(first.surveys_completed, 0);

        tracker
            .complete_survey(&user_id, Plan::Regular)
            .await
            .unwrap();
        // Re-selecting must not reset the counter
        let again = tracker.select_plan(&user_id, Plan::Regular).await.unwrap();
        assert_eq!(again.surveys_completed, 1);
    }

    #[tokio::test]
    async fn test_survey_requires_selected_plan() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = register(&ctx).await;
        let tracker = ProgressTracker::new(&ctx);

        let err = tracker
            .complete_survey(&user_id, Plan::Vip)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(LedgerError::PlanNotSelected(Plan::Vip))
        ));
    }

    #[tokio::test]
    async fn test_tenth_survey_completes_and_credits_once() {
        let (ctx, notifier, _dir) = test_ctx().await;
        let user_id = register(&ctx).await;
        let tracker = ProgressTracker::new(&ctx);
        tracker.select_plan(&user_id, Plan::Regular).await.unwrap();

        for expected in 1..=9u8 {
            let progress = tracker
                .complete_survey(&user_id, Plan::Regular)
                .await
                .unwrap();
            assert_eq!(progress.surveys_completed, expected);
            assert!(!progress.completed);
        }

        let done = tracker
            .complete_survey(&user_id, Plan::Regular)
            .await
            .unwrap();
        assert_eq!(done.surveys_completed, 10);
        assert!(done.completed);

        let user = ctx.store().load_user(&user_id).await.unwrap();
        assert_eq!(user.total_earned, dec!(1500));
        assert_eq!(notifier.count_of(NotificationKind::PlanCompleted), 1);

        // Idempotent completion: no re-increment, no re-credit
        let after = tracker
            .complete_survey(&user_id, Plan::Regular)
            .await
            .unwrap();
        assert_eq!(after.surveys_completed, 10);
        let user = ctx.store().load_user(&user_id).await.unwrap();
        assert_eq!(user.total_earned, dec!(1500));
        assert_eq!(notifier.count_of(NotificationKind::PlanCompleted), 1);
    }

    #[tokio::test]
    async fn test_progress_view() {
        let (ctx, _, _dir) = test_ctx().await;
        let user_id = register(&ctx).await;
        let tracker = ProgressTracker::new(&ctx);

        tracker.select_plan(&user_id, Plan::Vip).await.unwrap();
        tracker.select_plan(&user_id, Plan::Regular).await.unwrap();
        for _ in 0..10 {
            tracker.complete_survey(&user_id, Plan::Vip).await.unwrap();
        }
        tracker
            .complete_survey(&user_id, Plan::Regular)
            .await
            .unwrap();

        let view = tracker.progress(&user_id).await.unwrap();
        assert_eq!(view.plans.len(), 2);
        // Sorted lowest tier first
        assert_eq!(view.plans[0].plan, Plan::Regular);
        assert_eq!(view.total_surveys_completed, 11);
        assert_eq!(view.active_plan, Some(Plan::Vip));
    }
}
