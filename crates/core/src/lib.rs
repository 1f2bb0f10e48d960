//! # PanelPay Core
//!
//! Core domain types for the PanelPay rewards ledger:
//! - `Plan`: closed enumeration of survey tracks with fixed fee/earning tables
//! - `User`: root aggregate owning plan progress, requests and commissions
//! - `ActivationRequest` / `WithdrawalRequest` / `ReferralCommission`
//! - `LedgerEvent`: append-only journal record
//! - `LedgerError`: domain error taxonomy

pub mod actor;
pub mod config;
pub mod error;
pub mod event;
pub mod plan;
pub mod referral;
pub mod request;
pub mod user;

pub use actor::{Actor, Role};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use event::{LedgerEvent, LedgerEventKind};
pub use plan::Plan;
pub use request::{
    ActivationRequest, ActivationStatus, ReferralCommission, WithdrawalKind, WithdrawalRequest,
    WithdrawalStatus,
};
pub use user::{PlanProgress, User};
