//! Operator commands - review queues and request disposition

use anyhow::Result;
use panelpay_business::{ActivationWorkflow, ServiceContext, WithdrawalLedger};
use panelpay_core::{Actor, WithdrawalKind};
use panelpay_reports::{
    ActivationQueueReport, CsvExporter, JsonExporter, MarkdownExporter, ReportData,
    ReportExporter, WithdrawalQueueReport,
};
use std::path::Path;

use crate::db;
use crate::{ActivationAction, FormatArg, WithdrawAction};

fn render(report: &dyn ReportData, format: FormatArg) -> String {
    match format {
        FormatArg::Markdown => MarkdownExporter::new().export(report),
        FormatArg::Json => JsonExporter::new().export(report),
        FormatArg::Csv => CsvExporter::new().export(report),
    }
}

/// Handle activation subcommands
pub async fn handle_activation(
    db_path: &Path,
    journal_dir: &Path,
    action: ActivationAction,
) -> Result<()> {
    let database = db::connect(db_path, journal_dir).await?;
    let ctx = ServiceContext::new(&database);
    let workflow = ActivationWorkflow::new(&ctx);

    match action {
        ActivationAction::Submit {
            user_id,
            plan,
            payment_reference,
        } => {
            let request = workflow
                .submit(&user_id, plan.to_plan(), &payment_reference)
                .await?;
            println!("✅ Activation submitted: {}", request.id);
            println!("   Plan: {}  Fee: {}", request.plan, request.amount);
            println!("   Awaiting operator verification of {}", request.payment_reference);
        }

        ActivationAction::Approve {
            user_id,
            request_id,
            admin,
        } => {
            let request = workflow
                .approve(&Actor::admin(&admin), &user_id, &request_id)
                .await?;
            println!("✅ Activation {} approved - plan {} unlocked", request.id, request.plan);
        }

        ActivationAction::Reject {
            user_id,
            request_id,
            admin,
        } => {
            let request = workflow
                .reject(&Actor::admin(&admin), &user_id, &request_id)
                .await?;
            println!("🚫 Activation {} rejected", request.id);
        }

        ActivationAction::Pending { format } => {
            let rows = workflow.pending().await?;
            let report = ActivationQueueReport::new("Pending Activations", rows);
            if report.is_empty() {
                println!("Queue is empty");
            } else {
                println!("{}", render(&report, format));
            }
        }

        ActivationAction::List { format } => {
            let rows = workflow.all().await?;
            let report = ActivationQueueReport::new("All Activation Requests", rows);
            println!("{}", render(&report, format));
        }
    }

    Ok(())
}

/// Handle withdrawal subcommands
pub async fn handle_withdraw(
    db_path: &Path,
    journal_dir: &Path,
    action: WithdrawAction,
) -> Result<()> {
    let database = db::connect(db_path, journal_dir).await?;
    let ctx = ServiceContext::new(&database);
    let ledger = WithdrawalLedger::new(&ctx);

    match action {
        WithdrawAction::Request {
            user_id,
            phone,
            amount,
            welcome_bonus,
        } => {
            let kind = if welcome_bonus {
                WithdrawalKind::WelcomeBonus
            } else {
                WithdrawalKind::Normal
            };
            let request = ledger.request(&user_id, &phone, amount, kind).await?;
            println!("✅ Withdrawal queued: {}", request.id);
            println!(
                "   Gross: {}  Fee: {}  Net payout: {}",
                request.amount, request.fee, request.net_amount
            );
            println!("   To: {}", request.phone);
        }

        WithdrawAction::Approve { request_id, admin } => {
            let request = ledger.approve(&Actor::admin(&admin), &request_id).await?;
            println!(
                "✅ Withdrawal {} approved - pay out {} to {}",
                request.id, request.net_amount, request.phone
            );
        }

        WithdrawAction::Reject { request_id, admin } => {
            let request = ledger.reject(&Actor::admin(&admin), &request_id).await?;
            println!(
                "🚫 Withdrawal {} rejected - {} restored to the balance",
                request.id, request.amount
            );
        }

        WithdrawAction::Pending { format } => {
            let rows = ledger.pending().await?;
            let report = WithdrawalQueueReport::new("Pending Withdrawals", rows);
            if report.is_empty() {
                println!("Queue is empty");
            } else {
                println!("{}", render(&report, format));
            }
        }

        WithdrawAction::List { format } => {
            let rows = ledger.all().await?;
            let report = WithdrawalQueueReport::new("All Withdrawal Requests", rows);
            println!("{}", render(&report, format));
        }
    }

    Ok(())
}
