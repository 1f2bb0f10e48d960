//! Operator review queues as exportable reports.
//!
//! Wraps the persistence queue projections in `ReportData` so the same
//! queue renders as a console table, Markdown or JSON for manual review.

use crate::exporters::ReportData;
use chrono::{DateTime, Utc};
use panelpay_persistence::{ActivationQueueRow, WithdrawalQueueRow};
use rust_decimal::Decimal;
use std::str::FromStr;

fn fmt_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn sum_amounts<'a, I: Iterator<Item = &'a String>>(amounts: I) -> Decimal {
    amounts
        .filter_map(|a| Decimal::from_str(a).ok())
        .sum()
}

/// Activation review queue report
pub struct ActivationQueueReport {
    title: String,
    rows: Vec<ActivationQueueRow>,
    generated_at: DateTime<Utc>,
}

impl ActivationQueueReport {
    pub fn new(title: &str, rows: Vec<ActivationQueueRow>) -> Self {
        Self {
            title: title.to_string(),
            rows,
            generated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ReportData for ActivationQueueReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        vec![
            "request_id".into(),
            "user".into(),
            "phone".into(),
            "plan".into(),
            "fee".into(),
            "payment_reference".into(),
            "status".into(),
            "created_at".into(),
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| {
                vec![
                    r.id.clone(),
                    format!("{} ({})", r.name, r.user_id),
                    r.user_phone.clone(),
                    r.plan.clone(),
                    r.amount.clone(),
                    r.payment_reference.clone(),
                    r.status.clone(),
                    fmt_time(&r.created_at),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let total_fees = sum_amounts(self.rows.iter().map(|r| &r.amount));
        vec![
            ("requests".into(), self.rows.len().to_string()),
            ("total_fees".into(), total_fees.to_string()),
            ("generated_at".into(), fmt_time(&self.generated_at)),
        ]
    }
}

/// Withdrawal review queue report
pub struct WithdrawalQueueReport {
    title: String,
    rows: Vec<WithdrawalQueueRow>,
    generated_at: DateTime<Utc>,
}

impl WithdrawalQueueReport {
    pub fn new(title: &str, rows: Vec<WithdrawalQueueRow>) -> Self {
        Self {
            title: title.to_string(),
            rows,
            generated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ReportData for WithdrawalQueueReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        vec![
            "request_id".into(),
            "user".into(),
            "payout_phone".into(),
            "amount".into(),
            "fee".into(),
            "net_amount".into(),
            "kind".into(),
            "status".into(),
            "created_at".into(),
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| {
                vec![
                    r.id.clone(),
                    format!("{} ({})", r.name, r.user_id),
                    r.phone.clone(),
                    r.amount.clone(),
                    r.fee.clone(),
                    r.net_amount.clone(),
                    r.kind.clone(),
                    r.status.clone(),
                    fmt_time(&r.created_at),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let total_net = sum_amounts(self.rows.iter().map(|r| &r.net_amount));
        vec![
            ("requests".into(), self.rows.len().to_string()),
            ("total_net_payout".into(), total_net.to_string()),
            ("generated_at".into(), fmt_time(&self.generated_at)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporters::{MarkdownExporter, ReportExporter};

    fn withdrawal_row(id: &str, net: &str) -> WithdrawalQueueRow {
        WithdrawalQueueRow {
            id: id.to_string(),
            user_id: "USR-AB12CD34".to_string(),
            name: "Alice".to_string(),
            email: None,
            phone: "0712345678".to_string(),
            amount: "1500".to_string(),
            fee: "10".to_string(),
            net_amount: net.to_string(),
            kind: "normal".to_string(),
            status: "processing".to_string(),
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    #[test]
    fn test_withdrawal_queue_summary_totals() {
        let report = WithdrawalQueueReport::new(
            "Pending Withdrawals",
            vec![withdrawal_row("WDR-1", "1490"), withdrawal_row("WDR-2", "490")],
        );
        let summary = report.summary();
        assert_eq!(summary[0], ("requests".to_string(), "2".to_string()));
        assert_eq!(summary[1].1, "1980");
    }

    #[test]
    fn test_queue_renders_as_markdown() {
        let report =
            WithdrawalQueueReport::new("Pending Withdrawals", vec![withdrawal_row("WDR-1", "1490")]);
        let out = MarkdownExporter::new().export(&report);
        assert!(out.contains("# Pending Withdrawals"));
        assert!(out.contains("Alice (USR-AB12CD34)"));
        assert!(out.contains("1490"));
    }

    #[test]
    fn test_empty_queue() {
        let report = ActivationQueueReport::new("Pending Activations", Vec::new());
        assert!(report.is_empty());
        assert_eq!(report.rows().len(), 0);
    }
}
