//! SQLite persistence module
//!
//! Repository pattern for SQLite database access.

pub mod repos;
pub mod schema;

pub use repos::{create_pool, create_schema, init_database, QueueRepo, UserRepo};
pub use schema::{
    ActivationQueueRow, ActivationRequestRow, PlanProgressRow, ReferralCommissionRow, UserRow,
    WithdrawalQueueRow, WithdrawalRequestRow,
};
