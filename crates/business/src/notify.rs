//! Notification collaborator contract.
//!
//! The ledger emits events to an external delivery service it knows
//! nothing about. Delivery is fire-and-forget: a failed notify surfaces as
//! a logged warning and never rolls back the ledger transaction that
//! produced it.

use panelpay_core::Plan;
use rust_decimal::Decimal;
use std::sync::Mutex;
use thiserror::Error;

/// What the user is being told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    PlanCompleted,
    ActivationSubmitted,
    ActivationApproved,
    ActivationRejected,
    WithdrawalRequested,
    WithdrawalApproved,
    WithdrawalRejected,
    CommissionCredited,
}

/// One outbound notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub user_id: String,
    pub kind: NotificationKind,
    pub plan: Option<Plan>,
    pub amount: Option<Decimal>,
    pub request_id: Option<String>,
}

impl Notification {
    pub fn new(user_id: &str, kind: NotificationKind) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind,
            plan: None,
            amount: None,
            request_id: None,
        }
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_request(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }
}

/// Delivery failure reported by a notifier.
#[derive(Debug, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound delivery collaborator.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Default notifier: logs the event via tracing.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            user_id = %notification.user_id,
            kind = ?notification.kind,
            amount = ?notification.amount,
            "notification"
        );
        Ok(())
    }
}

/// Captures notifications for assertions in tests.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count_of(&self, kind: NotificationKind) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Always fails - for verifying that delivery failure never affects the
/// ledger transaction.
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError("delivery channel down".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_recording_notifier_counts_by_kind() {
        let notifier = RecordingNotifier::new();
        notifier
            .notify(&Notification::new("USR-A", NotificationKind::PlanCompleted))
            .unwrap();
        notifier
            .notify(
                &Notification::new("USR-A", NotificationKind::WithdrawalRequested)
                    .with_amount(dec!(1500)),
            )
            .unwrap();

        assert_eq!(notifier.sent().len(), 2);
        assert_eq!(notifier.count_of(NotificationKind::PlanCompleted), 1);
        assert_eq!(notifier.count_of(NotificationKind::ActivationApproved), 0);
    }

    #[test]
    fn test_failing_notifier_errors() {
        let notifier = FailingNotifier;
        let result = notifier.notify(&Notification::new("USR-A", NotificationKind::PlanCompleted));
        assert!(result.is_err());
    }
}
