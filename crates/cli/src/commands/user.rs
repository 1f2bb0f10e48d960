//! Member-facing commands - register, plans, surveys, affiliate stats

use anyhow::Result;
use panelpay_business::{ProgressTracker, ReferralEngine, RegistrationService, ServiceContext};
use panelpay_core::Plan;
use std::path::Path;

use crate::db;

/// Register a new user, optionally attributed to a referral code
pub async fn register(
    db_path: &Path,
    journal_dir: &Path,
    name: &str,
    phone: &str,
    email: Option<String>,
    code: Option<String>,
) -> Result<()> {
    let database = db::connect(db_path, journal_dir).await?;
    let ctx = ServiceContext::new(&database);

    let user = RegistrationService::new(&ctx)
        .register(name, phone, email.as_deref(), code.as_deref())
        .await?;

    println!("✅ Registered {}", user.id);
    println!("   Name:          {}", user.name);
    println!("   Phone:         {}", user.phone);
    println!("   Welcome bonus: {}", user.welcome_bonus);
    if let Some(referrer) = &user.referred_by {
        println!("   Referred by:   {}", referrer);
    }
    Ok(())
}

/// Create the progress entry for a plan
pub async fn select_plan(
    db_path: &Path,
    journal_dir: &Path,
    user_id: &str,
    plan: Plan,
) -> Result<()> {
    let database = db::connect(db_path, journal_dir).await?;
    let ctx = ServiceContext::new(&database);

    let progress = ProgressTracker::new(&ctx).select_plan(user_id, plan).await?;
    println!(
        "✅ Plan {} selected ({}/10 surveys)",
        plan, progress.surveys_completed
    );
    Ok(())
}

/// Record one survey completion
pub async fn complete_survey(
    db_path: &Path,
    journal_dir: &Path,
    user_id: &str,
    plan: Plan,
) -> Result<()> {
    let database = db::connect(db_path, journal_dir).await?;
    let ctx = ServiceContext::new(&database);

    let progress = ProgressTracker::new(&ctx)
        .complete_survey(user_id, plan)
        .await?;

    if progress.completed {
        println!(
            "🎉 Plan {} complete! {} credited to the balance",
            plan,
            plan.total_earning()
        );
    } else {
        println!(
            "✅ Survey recorded ({}/10 on plan {})",
            progress.surveys_completed, plan
        );
    }
    Ok(())
}

/// Show progress across all plans
pub async fn show_progress(db_path: &Path, journal_dir: &Path, user_id: &str) -> Result<()> {
    let database = db::connect(db_path, journal_dir).await?;
    let ctx = ServiceContext::new(&database);

    let view = ProgressTracker::new(&ctx).progress(user_id).await?;
    let user = ctx.store().load_user(user_id).await?;

    println!("📊 Progress for {} ({})", user.name, user.id);
    println!("   Balance:   {}", user.total_earned);
    println!("   Activated: {}", user.is_activated());
    println!();
    if view.plans.is_empty() {
        println!("   No plan selected yet");
    }
    for progress in &view.plans {
        let state = if progress.is_activated {
            "activated"
        } else if progress.completed {
            "awaiting activation"
        } else {
            "in progress"
        };
        println!(
            "   {:8} {:2}/10  {}",
            progress.plan.to_string(),
            progress.surveys_completed,
            state
        );
    }
    println!();
    println!("   Total surveys: {}", view.total_surveys_completed);
    if let Some(plan) = view.active_plan {
        println!("   Next to activate: {}", plan);
    }
    Ok(())
}

/// Show affiliate stats, generating the referral code on first call
pub async fn show_affiliate(db_path: &Path, journal_dir: &Path, user_id: &str) -> Result<()> {
    let database = db::connect(db_path, journal_dir).await?;
    let ctx = ServiceContext::new(&database);

    let stats = ReferralEngine::new(&ctx).affiliate_stats(user_id).await?;

    println!("🔗 Affiliate stats for {}", stats.user_id);
    println!("   Referral code:     {}", stats.referral_code);
    println!("   Commission earned: {}", stats.commission_earned);
    println!("   Referrals:         {}", stats.total_referrals);
    for referral in &stats.referrals {
        println!(
            "     {} +{} on {}",
            referral.referred_user_id,
            referral.amount,
            referral.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
