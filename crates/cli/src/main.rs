//! PanelPay CLI - rewards ledger operations from the command line
//!
//! Usage:
//! ```bash
//! panelpay init
//! panelpay register "Alice" 0712345678 --email alice@example.com
//! panelpay select USR-AB12CD34 regular
//! panelpay survey USR-AB12CD34 regular
//! panelpay activation submit USR-AB12CD34 regular MPESA-QX12ZZ
//! panelpay activation approve USR-AB12CD34 ACT-9F3A1B2C --admin OPS-1
//! panelpay withdraw request USR-AB12CD34 0712345678 1500
//! panelpay withdraw pending --format json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use panelpay_core::Plan;
use rust_decimal::Decimal;
use std::path::PathBuf;

mod commands;
mod db;

use commands::{admin, user};

/// PanelPay - survey rewards ledger with operator-verified payouts
#[derive(Parser)]
#[command(name = "panelpay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, default_value = "data/panelpay.db", global = true)]
    pub db: PathBuf,

    /// Journal directory path
    #[arg(long, default_value = "data/journal", global = true)]
    pub journal_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Plan tier argument
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlanArg {
    Regular,
    Vip,
    Vvip,
}

impl PlanArg {
    pub fn to_plan(self) -> Plan {
        match self {
            PlanArg::Regular => Plan::Regular,
            PlanArg::Vip => Plan::Vip,
            PlanArg::Vvip => Plan::Vvip,
        }
    }
}

/// Output format for queue listings
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum FormatArg {
    #[default]
    Markdown,
    Json,
    Csv,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and journal
    Init {
        /// Remove an existing database first
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,

    /// Register a new user
    Register {
        /// Full name
        name: String,
        /// Mobile-money phone number
        phone: String,
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// Referral code of the inviting user
        #[arg(long)]
        code: Option<String>,
    },

    /// Select a plan, creating its progress entry
    Select {
        user_id: String,
        plan: PlanArg,
    },

    /// Record one survey completion
    Survey {
        user_id: String,
        plan: PlanArg,
    },

    /// Show progress across all plans
    Progress { user_id: String },

    /// Show affiliate stats (generates the referral code on first call)
    Affiliate { user_id: String },

    /// Activation request workflow
    Activation {
        #[command(subcommand)]
        action: ActivationAction,
    },

    /// Withdrawal ledger
    Withdraw {
        #[command(subcommand)]
        action: WithdrawAction,
    },
}

#[derive(Subcommand)]
pub enum ActivationAction {
    /// Submit an activation claim for a completed plan
    Submit {
        user_id: String,
        plan: PlanArg,
        /// Mobile-money transaction code for the fee payment
        payment_reference: String,
    },
    /// Approve a submitted request
    Approve {
        user_id: String,
        request_id: String,
        /// Operator id
        #[arg(long)]
        admin: String,
    },
    /// Reject a submitted request
    Reject {
        user_id: String,
        request_id: String,
        #[arg(long)]
        admin: String,
    },
    /// List submitted requests, oldest first
    Pending {
        #[arg(long, value_enum, default_value = "markdown")]
        format: FormatArg,
    },
    /// List all requests, newest first
    List {
        #[arg(long, value_enum, default_value = "markdown")]
        format: FormatArg,
    },
}

#[derive(Subcommand)]
pub enum WithdrawAction {
    /// Request a payout (funds are reserved immediately)
    Request {
        user_id: String,
        /// Payout phone number
        phone: String,
        /// Gross amount
        amount: Decimal,
        /// Withdraw the one-shot welcome bonus instead of earnings
        #[arg(long)]
        welcome_bonus: bool,
    },
    /// Approve a processing request
    Approve {
        request_id: String,
        #[arg(long)]
        admin: String,
    },
    /// Reject a processing request, restoring the reservation
    Reject {
        request_id: String,
        #[arg(long)]
        admin: String,
    },
    /// List processing requests
    Pending {
        #[arg(long, value_enum, default_value = "markdown")]
        format: FormatArg,
    },
    /// List all requests, newest first
    List {
        #[arg(long, value_enum, default_value = "markdown")]
        format: FormatArg,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            db::init_database(&cli.db, &cli.journal_dir, force).await?;
        }

        Commands::Status => {
            db::show_status(&cli.db).await?;
        }

        Commands::Register {
            name,
            phone,
            email,
            code,
        } => {
            user::register(&cli.db, &cli.journal_dir, &name, &phone, email, code).await?;
        }

        Commands::Select { user_id, plan } => {
            user::select_plan(&cli.db, &cli.journal_dir, &user_id, plan.to_plan()).await?;
        }

        Commands::Survey { user_id, plan } => {
            user::complete_survey(&cli.db, &cli.journal_dir, &user_id, plan.to_plan()).await?;
        }

        Commands::Progress { user_id } => {
            user::show_progress(&cli.db, &cli.journal_dir, &user_id).await?;
        }

        Commands::Affiliate { user_id } => {
            user::show_affiliate(&cli.db, &cli.journal_dir, &user_id).await?;
        }

        Commands::Activation { action } => {
            admin::handle_activation(&cli.db, &cli.journal_dir, action).await?;
        }

        Commands::Withdraw { action } => {
            admin::handle_withdraw(&cli.db, &cli.journal_dir, action).await?;
        }
    }

    Ok(())
}
