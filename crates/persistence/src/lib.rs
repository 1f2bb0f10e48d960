//! # PanelPay Persistence
//!
//! Persistence layer for the rewards ledger - SQLite + JSONL journal.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Database                               │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐  │
//! │  │   SQLite    │    │    JSONL    │    │  LedgerStore    │  │
//! │  │  (state)    │    │  (journal)  │    │ (per-user lock) │  │
//! │  └─────────────┘    └─────────────┘    └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every state transition goes through `LedgerStore::with_user`, which
//! holds an exclusive per-user lock across a transaction. Queue reads are
//! plain projections served without the write lock.

pub mod error;
pub mod journal;
pub mod sqlite;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use journal::{JournalReader, JournalStore};
pub use sqlite::{
    create_pool, create_schema, init_database, ActivationQueueRow, QueueRepo, UserRow,
    UserRepo, WithdrawalQueueRow,
};
pub use store::LedgerStore;

use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

/// Database facade - unified access to the SQLite state and the journal.
///
/// Constructed once at process start and handed to each component; there
/// is no module-level handle and nothing is re-created mid-request.
pub struct Database {
    pool: SqlitePool,
    journal: Arc<JournalStore>,
}

impl Database {
    /// Connect to an existing database
    ///
    /// # Arguments
    /// * `db_url` - SQLite database URL (e.g., "sqlite:panelpay.db")
    /// * `journal_path` - Path to the JSONL journal directory
    pub async fn new<Q: AsRef<Path>>(db_url: &str, journal_path: Q) -> StoreResult<Self> {
        let pool = create_pool(db_url).await?;
        let journal = Arc::new(JournalStore::new(journal_path)?);
        Ok(Self { pool, journal })
    }

    /// Create the database and schema if missing, then connect
    pub async fn init<Q: AsRef<Path>>(db_url: &str, journal_path: Q) -> StoreResult<Self> {
        let pool = init_database(db_url).await?;
        let journal = Arc::new(JournalStore::new(journal_path)?);
        Ok(Self { pool, journal })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn journal(&self) -> Arc<JournalStore> {
        self.journal.clone()
    }

    /// Journal reader for audit views
    pub fn journal_reader(&self) -> JournalReader {
        JournalReader::new(self.journal.base_path())
    }

    /// Lock-scoped store over this database's pool
    pub fn ledger_store(&self) -> LedgerStore {
        LedgerStore::new(self.pool.clone())
    }
}
