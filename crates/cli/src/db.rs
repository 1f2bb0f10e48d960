//! Database initialization and status

use anyhow::{Context, Result};
use panelpay_persistence::Database;
use sqlx::SqlitePool;
use std::path::Path;

fn db_url(db_path: &Path) -> String {
    format!("sqlite:{}", db_path.display())
}

/// Initialize the database with schema
pub async fn init_database(db_path: &Path, journal_dir: &Path, force: bool) -> Result<()> {
    if force && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to remove existing database")?;
        println!("🗑️  Removed existing database");
    }

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create data directory")?;
    }

    println!("📦 Creating schema...");
    let url = format!("{}?mode=rwc", db_url(db_path));
    let pool = panelpay_persistence::init_database(&url)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;

    panelpay_persistence::JournalStore::new(journal_dir)
        .context("Failed to initialize journal directory")?;

    println!("✅ Database ready at {:?}", db_path);
    Ok(())
}

/// Show database status
pub async fn show_status(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        println!("❌ Database not found at {:?}", db_path);
        println!("   Run 'panelpay init' to create the database");
        return Ok(());
    }

    let pool = SqlitePool::connect(&db_url(db_path)).await?;

    println!("📊 Database Status");
    println!("   Path: {:?}", db_path);
    println!();

    let users: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap_or((0,));
    let activations: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM activation_requests")
        .fetch_one(&pool)
        .await
        .unwrap_or((0,));
    let pending_activations: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM activation_requests WHERE status = 'submitted'")
            .fetch_one(&pool)
            .await
            .unwrap_or((0,));
    let withdrawals: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM withdrawal_requests")
        .fetch_one(&pool)
        .await
        .unwrap_or((0,));
    let pending_withdrawals: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM withdrawal_requests WHERE status = 'processing'")
            .fetch_one(&pool)
            .await
            .unwrap_or((0,));

    println!("   Users:                {}", users.0);
    println!("   Activation requests:  {} ({} pending)", activations.0, pending_activations.0);
    println!("   Withdrawal requests:  {} ({} pending)", withdrawals.0, pending_withdrawals.0);

    pool.close().await;
    Ok(())
}

/// Connect to the database facade
pub async fn connect(db_path: &Path, journal_dir: &Path) -> Result<Database> {
    Database::new(&db_url(db_path), journal_dir)
        .await
        .context("Failed to connect to database. Run 'panelpay init' first.")
}
