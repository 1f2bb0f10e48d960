//! # Ledger Store
//!
//! The single serialization point for aggregate mutations.
//!
//! `with_user` acquires an exclusive per-user lock, opens a transaction,
//! loads the aggregate fresh, runs the caller's closure against it, saves
//! and commits. Any error from the closure aborts the transaction, so a
//! failed mutation leaves no observable partial state. Two calls for the
//! same user never interleave; calls for different users proceed
//! independently.
//!
//! There is no trusted in-memory copy of a user between calls - every
//! mutation re-reads current state under the lock before deciding the
//! transition.

use crate::error::{StoreError, StoreResult};
use crate::sqlite::UserRepo;
use panelpay_core::{LedgerError, User};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

/// Lock-scoped access to user aggregates.
pub struct LedgerStore {
    pool: SqlitePool,
    /// One async mutex per user id, created on first use
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl LedgerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checkout a connection for lock-free reads (queue projections)
    pub async fn acquire(&self) -> StoreResult<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    fn user_lock(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Run `f` against a consistent snapshot of the user aggregate.
    ///
    /// The per-user lock is held across load, mutate and commit. `f` must
    /// be synchronous: all I/O stays in the store, the closure only decides
    /// the transition.
    pub async fn with_user<T, F>(&self, user_id: &str, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut User) -> Result<T, LedgerError>,
    {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut tx = self.pool.begin().await?;
        let mut user = UserRepo::load(&mut *tx, user_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))?;

        // Closure error -> tx dropped uncommitted -> full rollback
        let out = f(&mut user)?;

        UserRepo::save(&mut *tx, &user).await?;
        tx.commit().await?;
        Ok(out)
    }

    /// Insert a freshly registered user (no lock needed - the aggregate
    /// does not exist yet, so nothing can race its creation)
    pub async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        if UserRepo::get_row(&mut *tx, &user.id).await?.is_some() {
            return Err(StoreError::already_exists("User", &user.id));
        }
        UserRepo::insert(&mut *tx, user).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Read-only aggregate load, served without the write lock
    pub async fn load_user(&self, user_id: &str) -> StoreResult<User> {
        let mut conn = self.pool.acquire().await?;
        UserRepo::load(&mut conn, user_id)
            .await?
            .ok_or_else(|| StoreError::Domain(LedgerError::UserNotFound(user_id.to_string())))
    }

    /// Read-only referral code resolution
    pub async fn resolve_referral_code(&self, code: &str) -> StoreResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        UserRepo::find_by_referral_code(&mut conn, code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelpay_core::{Plan, PlanProgress};
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store_with_user(name: &str) -> (Arc<LedgerStore>, String) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::sqlite::create_schema(&pool).await.unwrap();

        let store = Arc::new(LedgerStore::new(pool));
        let user = User::new(name, "0712345678", dec!(250));
        let id = user.id.clone();
        store.insert_user(&user).await.unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn test_with_user_commits_mutation() {
        let (store, id) = store_with_user("Alice").await;

        store
            .with_user(&id, |user| {
                user.credit(dec!(1500));
                Ok(())
            })
            .await
            .unwrap();

        let user = store.load_user(&id).await.unwrap();
        assert_eq!(user.total_earned, dec!(1500));
    }

    #[tokio::test]
    async fn test_with_user_rolls_back_on_error() {
        let (store, id) = store_with_user("Bob").await;

        let result: StoreResult<()> = store
            .with_user(&id, |user| {
                user.credit(dec!(999));
                user.plans.insert(Plan::Vip, PlanProgress::new(Plan::Vip));
                Err(LedgerError::NotActivated)
            })
            .await;
        assert!(matches!(
            result.unwrap_err(),
            StoreError::Domain(LedgerError::NotActivated)
        ));

        // Nothing from the failed closure is visible
        let user = store.load_user(&id).await.unwrap();
        assert_eq!(user.total_earned, dec!(0));
        assert!(user.plans.is_empty());
    }

    #[tokio::test]
    async fn test_with_user_unknown_user() {
        let (store, _) = store_with_user("Carol").await;
        let result: StoreResult<()> = store.with_user("USR-MISSING", |_| Ok(())).await;
        assert!(matches!(
            result.unwrap_err(),
            StoreError::Domain(LedgerError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_same_user_mutations_serialize() {
        let (store, id) = store_with_user("Dave").await;

        // 20 concurrent increments of 10 each; a lost update would leave
        // the total short
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .with_user(&id, |user| {
                        user.credit(dec!(10));
                        Ok(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let user = store.load_user(&id).await.unwrap();
        assert_eq!(user.total_earned, dec!(200));
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let (store, id) = store_with_user("Eve").await;
        let user = store.load_user(&id).await.unwrap();
        let err = store.insert_user(&user).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }
}
