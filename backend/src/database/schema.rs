//! Database schema and migrations
//!
//! This module handles database initialization and schema migrations.
//! Uses SQLite with WAL mode for better concurrency and crash safety.

use crate::config::DEFAULT_FOLDERS;
use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};

/// Initialize database with schema
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Initializing database schema");

    // Enable WAL mode for better performance and crash safety
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    // Create migrations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Get current version
    let current_version: i32 = sqlx::query("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?
        .get(0);

    tracing::info!("Current database version: {}", current_version);

    // Databases created before order_index existed need the column before
    // the migration's index on it can be built.
    upgrade_legacy_notes_table(pool).await?;

    // Apply migrations
    apply_migrations(pool, current_version).await?;

    backfill_order_index(pool).await?;
    normalize_legacy_timestamps(pool).await?;
    seed_default_folders(pool).await?;

    tracing::info!("Database initialization complete");
    Ok(())
}

async fn apply_migrations(pool: &SqlitePool, current_version: i32) -> Result<()> {
    let migrations = get_migrations();

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Applying migration version {}", version);

            // Execute migration in a transaction
            let mut tx = pool.begin().await?;

            for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement).execute(&mut *tx).await?;
            }

            // Record migration
            sqlx::query("INSERT INTO migrations (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::info!("Migration version {} applied successfully", version);
        }
    }

    Ok(())
}

fn get_migrations() -> Vec<(i32, &'static str)> {
    vec![
        (1, include_str!("migrations/001_initial_schema.sql")),
        (2, include_str!("migrations/002_sync_log.sql")),
    ]
}

async fn upgrade_legacy_notes_table(pool: &SqlitePool) -> Result<()> {
    let notes_table: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'notes'",
    )
    .fetch_one(pool)
    .await?;

    if notes_table == 0 {
        return Ok(());
    }

    let has_order_index: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('notes') WHERE name = 'order_index'",
    )
    .fetch_one(pool)
    .await?;

    if has_order_index == 0 {
        tracing::info!("Adding order_index column to legacy notes table");
        sqlx::query("ALTER TABLE notes ADD COLUMN order_index INTEGER NOT NULL DEFAULT 0")
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Give legacy rows without an order a stable one derived from their id.
async fn backfill_order_index(pool: &SqlitePool) -> Result<()> {
    let updated = sqlx::query(
        "UPDATE notes SET order_index = id WHERE order_index = 0 OR order_index IS NULL",
    )
    .execute(pool)
    .await?
    .rows_affected();

    if updated > 0 {
        tracing::info!("Backfilled order_index for {} notes", updated);
    }

    Ok(())
}

/// Timestamp columns compared as text by the sync delta queries
const TIMESTAMP_COLUMNS: &[(&str, &str)] = &[
    ("folders", "created_at"),
    ("notes", "created_at"),
    ("notes", "updated_at"),
    ("attachments", "created_at"),
];

/// Shape of a timestamp written through sqlx: RFC 3339 in UTC
const CANONICAL_TIMESTAMP_GLOB: &str =
    "[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]T[0-9][0-9]:[0-9][0-9]:[0-9][0-9]*+00:00";

/// Rewrite timestamps stored by older writers (`CURRENT_TIMESTAMP`, local
/// offsets, `Z` suffix) into the canonical UTC form so text comparison
/// orders them by instant.
async fn normalize_legacy_timestamps(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    let mut rewritten = 0;

    for (table, column) in TIMESTAMP_COLUMNS {
        let rows: Vec<(i64, DateTime<Utc>)> = sqlx::query_as(&format!(
            "SELECT id, {column} FROM {table} WHERE {column} NOT GLOB ?"
        ))
        .bind(CANONICAL_TIMESTAMP_GLOB)
        .fetch_all(&mut *tx)
        .await?;

        for (id, instant) in rows {
            sqlx::query(&format!("UPDATE {table} SET {column} = ? WHERE id = ?"))
                .bind(instant)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            rewritten += 1;
        }
    }

    tx.commit().await?;

    if rewritten > 0 {
        tracing::info!("Normalized {} legacy timestamps", rewritten);
    }

    Ok(())
}

async fn seed_default_folders(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folders")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Ok(());
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;
    for name in DEFAULT_FOLDERS {
        sqlx::query("INSERT INTO folders (name, created_at) VALUES (?, ?)")
            .bind(*name)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!("Created default folders: {:?}", DEFAULT_FOLDERS);
    Ok(())
}
