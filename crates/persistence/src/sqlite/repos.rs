//! Repository implementations for SQLite
//!
//! Aggregate load/save plus the flattened operator-queue projections.
//! All functions take `&mut SqliteConnection` so they run equally inside a
//! transaction or against a pooled connection.

use crate::error::{StoreError, StoreResult};
use crate::sqlite::schema::*;
use panelpay_core::{ActivationRequest, PlanProgress, ReferralCommission, User, WithdrawalRequest};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;

// ============================================================================
// Database initialization
// ============================================================================

/// Connect to an existing database
pub async fn create_pool(database_url: &str) -> StoreResult<SqlitePool> {
    let pool = SqlitePool::connect(database_url).await?;
    Ok(pool)
}

/// Create the database (if missing) and its schema
pub async fn init_database(database_url: &str) -> StoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> StoreResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT NOT NULL,
            total_earned TEXT NOT NULL DEFAULT '0',
            welcome_bonus TEXT NOT NULL DEFAULT '0',
            welcome_bonus_withdrawn INTEGER NOT NULL DEFAULT 0,
            referred_by TEXT,
            referral_code TEXT UNIQUE,
            referral_commission_earned TEXT NOT NULL DEFAULT '0',
            created_at DATETIME NOT NULL,
            FOREIGN KEY (referred_by) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plan_progress (
            user_id TEXT NOT NULL,
            plan TEXT NOT NULL,
            surveys_completed INTEGER NOT NULL DEFAULT 0,
            completed INTEGER NOT NULL DEFAULT 0,
            is_activated INTEGER NOT NULL DEFAULT 0,
            activated_at DATETIME,
            PRIMARY KEY (user_id, plan),
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activation_requests (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            plan TEXT NOT NULL,
            payment_reference TEXT NOT NULL,
            amount TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            processed_at DATETIME,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_activation_requests_status
         ON activation_requests(status)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS withdrawal_requests (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            phone TEXT NOT NULL,
            amount TEXT NOT NULL,
            fee TEXT NOT NULL,
            net_amount TEXT NOT NULL,
            kind TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            processed_at DATETIME,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_withdrawal_requests_status
         ON withdrawal_requests(status)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS referral_commissions (
            referrer_id TEXT NOT NULL,
            referred_user_id TEXT NOT NULL,
            amount TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            PRIMARY KEY (referrer_id, referred_user_id),
            FOREIGN KEY (referrer_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

// ============================================================================
// User Repository
// ============================================================================

/// Repository for the `users` aggregate (root row + owned collections)
pub struct UserRepo;

impl UserRepo {
    /// Insert a freshly registered user
    pub async fn insert(conn: &mut SqliteConnection, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, name, email, phone, total_earned, welcome_bonus,
                 welcome_bonus_withdrawn, referred_by, referral_code,
                 referral_commission_earned, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.total_earned.to_string())
        .bind(user.welcome_bonus.to_string())
        .bind(user.welcome_bonus_withdrawn)
        .bind(&user.referred_by)
        .bind(&user.referral_code)
        .bind(user.referral_commission_earned.to_string())
        .bind(user.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Load the root row only
    pub async fn get_row(conn: &mut SqliteConnection, id: &str) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Load the full aggregate: root row plus all owned collections
    pub async fn load(conn: &mut SqliteConnection, id: &str) -> StoreResult<Option<User>> {
        let Some(row) = Self::get_row(&mut *conn, id).await? else {
            return Ok(None);
        };
        let mut user = User::try_from(row)?;

        let plans = sqlx::query_as::<_, PlanProgressRow>(
            "SELECT * FROM plan_progress WHERE user_id = ?",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        for row in plans {
            let progress = PlanProgress::try_from(row)?;
            user.plans.insert(progress.plan, progress);
        }

        let activations = sqlx::query_as::<_, ActivationRequestRow>(
            "SELECT * FROM activation_requests WHERE user_id = ?",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        for row in activations {
            let request = ActivationRequest::try_from(row)?;
            user.activation_requests.insert(request.id.clone(), request);
        }

        let withdrawals = sqlx::query_as::<_, WithdrawalRequestRow>(
            "SELECT * FROM withdrawal_requests WHERE user_id = ?",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        for row in withdrawals {
            let request = WithdrawalRequest::try_from(row)?;
            user.withdrawal_requests.insert(request.id.clone(), request);
        }

        let commissions = sqlx::query_as::<_, ReferralCommissionRow>(
            "SELECT * FROM referral_commissions WHERE referrer_id = ?",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        for row in commissions {
            let commission = ReferralCommission::try_from(row)?;
            user.commissions
                .insert(commission.referred_user_id.clone(), commission);
        }

        Ok(Some(user))
    }

    /// Persist the whole aggregate. Sub-entities are upserted by key;
    /// domain rows are never deleted, so replace-at-key is complete.
    pub async fn save(conn: &mut SqliteConnection, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = ?, email = ?, phone = ?, total_earned = ?,
                welcome_bonus = ?, welcome_bonus_withdrawn = ?,
                referred_by = ?, referral_code = ?,
                referral_commission_earned = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.total_earned.to_string())
        .bind(user.welcome_bonus.to_string())
        .bind(user.welcome_bonus_withdrawn)
        .bind(&user.referred_by)
        .bind(&user.referral_code)
        .bind(user.referral_commission_earned.to_string())
        .bind(&user.id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("User", &user.id));
        }

        for progress in user.plans.values() {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO plan_progress
                    (user_id, plan, surveys_completed, completed, is_activated, activated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&user.id)
            .bind(progress.plan.as_str())
            .bind(progress.surveys_completed as i64)
            .bind(progress.completed)
            .bind(progress.is_activated)
            .bind(progress.activated_at)
            .execute(&mut *conn)
            .await?;
        }

        for request in user.activation_requests.values() {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO activation_requests
                    (id, user_id, plan, payment_reference, amount, status, created_at, processed_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&request.id)
            .bind(&user.id)
            .bind(request.plan.as_str())
            .bind(&request.payment_reference)
            .bind(request.amount.to_string())
            .bind(request.status.as_str())
            .bind(request.created_at)
            .bind(request.processed_at)
            .execute(&mut *conn)
            .await?;
        }

        for request in user.withdrawal_requests.values() {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO withdrawal_requests
                    (id, user_id, phone, amount, fee, net_amount, kind, status, created_at, processed_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&request.id)
            .bind(&user.id)
            .bind(&request.phone)
            .bind(request.amount.to_string())
            .bind(request.fee.to_string())
            .bind(request.net_amount.to_string())
            .bind(request.kind.as_str())
            .bind(request.status.as_str())
            .bind(request.created_at)
            .bind(request.processed_at)
            .execute(&mut *conn)
            .await?;
        }

        for commission in user.commissions.values() {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO referral_commissions
                    (referrer_id, referred_user_id, amount, created_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&user.id)
            .bind(&commission.referred_user_id)
            .bind(commission.amount.to_string())
            .bind(commission.created_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Resolve a referral code to its owner's id
    pub async fn find_by_referral_code(
        conn: &mut SqliteConnection,
        code: &str,
    ) -> StoreResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE referral_code = ?")
                .bind(code)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    pub async fn count(conn: &mut SqliteConnection) -> StoreResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Queue Repository (operator read models)
// ============================================================================

/// Flattened request queues joined with user identity for manual review.
/// Pure projections over the aggregate tables - there is no separate store.
pub struct QueueRepo;

impl QueueRepo {
    /// All submitted activation requests, oldest first (FIFO handling)
    pub async fn pending_activations(
        conn: &mut SqliteConnection,
    ) -> StoreResult<Vec<ActivationQueueRow>> {
        let rows = sqlx::query_as::<_, ActivationQueueRow>(
            r#"
            SELECT a.id, a.user_id, u.name, u.email, u.phone AS user_phone,
                   a.plan, a.payment_reference, a.amount, a.status,
                   a.created_at, a.processed_at
            FROM activation_requests a
            JOIN users u ON u.id = a.user_id
            WHERE a.status = 'submitted'
            ORDER BY a.created_at ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Every activation request, newest first
    pub async fn all_activations(
        conn: &mut SqliteConnection,
    ) -> StoreResult<Vec<ActivationQueueRow>> {
        let rows = sqlx::query_as::<_, ActivationQueueRow>(
            r#"
            SELECT a.id, a.user_id, u.name, u.email, u.phone AS user_phone,
                   a.plan, a.payment_reference, a.amount, a.status,
                   a.created_at, a.processed_at
            FROM activation_requests a
            JOIN users u ON u.id = a.user_id
            ORDER BY a.created_at DESC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// All processing withdrawal requests, newest first
    pub async fn pending_withdrawals(
        conn: &mut SqliteConnection,
    ) -> StoreResult<Vec<WithdrawalQueueRow>> {
        let rows = sqlx::query_as::<_, WithdrawalQueueRow>(
            r#"
            SELECT w.id, w.user_id, u.name, u.email, w.phone,
                   w.amount, w.fee, w.net_amount, w.kind, w.status,
                   w.created_at, w.processed_at
            FROM withdrawal_requests w
            JOIN users u ON u.id = w.user_id
            WHERE w.status = 'processing'
            ORDER BY w.created_at DESC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Every withdrawal request, newest first
    pub async fn all_withdrawals(
        conn: &mut SqliteConnection,
    ) -> StoreResult<Vec<WithdrawalQueueRow>> {
        let rows = sqlx::query_as::<_, WithdrawalQueueRow>(
            r#"
            SELECT w.id, w.user_id, u.name, u.email, w.phone,
                   w.amount, w.fee, w.net_amount, w.kind, w.status,
                   w.created_at, w.processed_at
            FROM withdrawal_requests w
            JOIN users u ON u.id = w.user_id
            ORDER BY w.created_at DESC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Find which user owns a withdrawal request
    pub async fn withdrawal_owner(
        conn: &mut SqliteConnection,
        request_id: &str,
    ) -> StoreResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM withdrawal_requests WHERE id = ?")
                .bind(request_id)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    pub async fn count_activations(conn: &mut SqliteConnection) -> StoreResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM activation_requests")
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.0)
    }

    pub async fn count_withdrawals(conn: &mut SqliteConnection) -> StoreResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM withdrawal_requests")
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelpay_core::{Plan, PlanProgress, WithdrawalKind};
    use rust_decimal_macros::dec;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_insert_load_roundtrip() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut user = User::new("Alice", "0712345678", dec!(250));
        user.plans
            .insert(Plan::Regular, PlanProgress::new(Plan::Regular));
        UserRepo::insert(&mut conn, &user).await.unwrap();
        UserRepo::save(&mut conn, &user).await.unwrap();

        let loaded = UserRepo::load(&mut conn, &user.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, user.id);
        assert_eq!(loaded.welcome_bonus, dec!(250));
        assert!(loaded.plans.contains_key(&Plan::Regular));

        let missing = UserRepo::load(&mut conn, "USR-MISSING").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_save_persists_balance_and_requests() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut user = User::new("Bob", "0798765432", dec!(250));
        UserRepo::insert(&mut conn, &user).await.unwrap();

        user.credit(dec!(1500));
        let request = panelpay_core::WithdrawalRequest::new(
            "0798765432",
            dec!(1500),
            dec!(10),
            WithdrawalKind::Normal,
        );
        user.withdrawal_requests
            .insert(request.id.clone(), request.clone());
        UserRepo::save(&mut conn, &user).await.unwrap();

        let loaded = UserRepo::load(&mut conn, &user.id).await.unwrap().unwrap();
        assert_eq!(loaded.total_earned, dec!(1500));
        let stored = loaded.withdrawal_requests.get(&request.id).unwrap();
        assert_eq!(stored.net_amount, dec!(1490));

        let owner = QueueRepo::withdrawal_owner(&mut conn, &request.id)
            .await
            .unwrap();
        assert_eq!(owner.as_deref(), Some(user.id.as_str()));
    }

    #[tokio::test]
    async fn test_queue_projection_joins_identity() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut user = User::new("Carol", "0700111222", dec!(250));
        UserRepo::insert(&mut conn, &user).await.unwrap();
        let request = panelpay_core::ActivationRequest::new(Plan::Regular, "MPESA-XY77");
        user.activation_requests
            .insert(request.id.clone(), request);
        UserRepo::save(&mut conn, &user).await.unwrap();

        let queue = QueueRepo::pending_activations(&mut conn).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].name, "Carol");
        assert_eq!(queue[0].user_phone, "0700111222");
        assert_eq!(queue[0].payment_reference, "MPESA-XY77");
    }

    #[tokio::test]
    async fn test_referral_code_lookup() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut user = User::new("Dan", "0711000111", dec!(250));
        user.referral_code = Some("ABCD2345".to_string());
        UserRepo::insert(&mut conn, &user).await.unwrap();

        let found = UserRepo::find_by_referral_code(&mut conn, "ABCD2345")
            .await
            .unwrap();
        assert_eq!(found.as_deref(), Some(user.id.as_str()));

        let missing = UserRepo::find_by_referral_code(&mut conn, "ZZZZ9999")
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
