//! # Event Module
//!
//! `LedgerEvent` records every committed ledger transition for the
//! append-only JSONL journal. The journal is an audit trail; it is written
//! after the database transaction commits and never participates in it.

use crate::plan::Plan;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventKind {
    UserRegistered,
    PlanSelected,
    SurveyCompleted,
    PlanCompleted,
    ActivationSubmitted,
    ActivationApproved,
    ActivationRejected,
    WithdrawalRequested,
    WithdrawalApproved,
    WithdrawalRejected,
    CommissionCredited,
}

impl LedgerEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEventKind::UserRegistered => "user_registered",
            LedgerEventKind::PlanSelected => "plan_selected",
            LedgerEventKind::SurveyCompleted => "survey_completed",
            LedgerEventKind::PlanCompleted => "plan_completed",
            LedgerEventKind::ActivationSubmitted => "activation_submitted",
            LedgerEventKind::ActivationApproved => "activation_approved",
            LedgerEventKind::ActivationRejected => "activation_rejected",
            LedgerEventKind::WithdrawalRequested => "withdrawal_requested",
            LedgerEventKind::WithdrawalApproved => "withdrawal_approved",
            LedgerEventKind::WithdrawalRejected => "withdrawal_rejected",
            LedgerEventKind::CommissionCredited => "commission_credited",
        }
    }
}

impl fmt::Display for LedgerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One committed transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Sequential id assigned by the journal (EVT_000123)
    pub event_id: String,
    pub kind: LedgerEventKind,
    /// Who performed the action (user or admin id)
    pub actor_id: String,
    /// Which aggregate was mutated
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEvent {
    pub fn new(event_id: &str, kind: LedgerEventKind, actor_id: &str, user_id: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            kind,
            actor_id: actor_id.to_string(),
            user_id: user_id.to_string(),
            plan: None,
            amount: None,
            request_id: None,
            created_at: Utc::now(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_builder() {
        let event = LedgerEvent::new(
            "EVT_000001",
            LedgerEventKind::PlanCompleted,
            "USR-AB12CD34",
            "USR-AB12CD34",
        )
        .with_plan(Plan::Regular)
        .with_amount(dec!(1500));

        assert_eq!(event.kind, LedgerEventKind::PlanCompleted);
        assert_eq!(event.plan, Some(Plan::Regular));
        assert_eq!(event.amount, Some(dec!(1500)));
        assert!(event.request_id.is_none());
    }

    #[test]
    fn test_event_json_skips_empty_fields() {
        let event = LedgerEvent::new(
            "EVT_000002",
            LedgerEventKind::UserRegistered,
            "USR-AB12CD34",
            "USR-AB12CD34",
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"user_registered\""));
        assert!(!json.contains("plan"));
        assert!(!json.contains("request_id"));
    }
}
