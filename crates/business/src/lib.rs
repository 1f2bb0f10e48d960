//! # PanelPay Business
//!
//! Business logic layer - the four components of the rewards ledger:
//!
//! - [`ProgressTracker`]: survey increments and one-time completion credit
//! - [`ActivationWorkflow`]: submit/approve/reject gating plan withdrawal
//! - [`WithdrawalLedger`]: balance reservation and payout disposition
//! - [`ReferralEngine`]: idempotent cross-user commission crediting
//!
//! Every mutation routes through the store's per-user lock; notifications
//! and journal appends happen after commit and are best-effort.

pub mod activation;
pub mod error;
pub mod notify;
pub mod progress;
pub mod referral;
pub mod registration;
pub mod services;
pub mod withdrawal;

pub use activation::ActivationWorkflow;
pub use error::{BusinessError, BusinessResult};
pub use notify::{
    FailingNotifier, Notification, NotificationKind, Notifier, RecordingNotifier, TracingNotifier,
};
pub use progress::{ProgressTracker, ProgressView};
pub use referral::{AffiliateStats, CommissionOutcome, ReferralEngine};
pub use registration::RegistrationService;
pub use services::ServiceContext;
pub use withdrawal::WithdrawalLedger;
