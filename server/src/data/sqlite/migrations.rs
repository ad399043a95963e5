//! Database migration system
//!
//! Version 1 is the whole schema, applied in one transaction on a fresh
//! database and recorded with its checksum. A database stamped with an older
//! version has no upgrade path and is rejected.

use sqlx::SqlitePool;

use super::error::SqliteError;
use super::schema::{SCHEMA, SCHEMA_VERSION};
use crate::utils::crypto::sha256_hex;

const INITIAL_NAME: &str = "initial_schema";

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteError> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        tracing::debug!(
            "Initializing database with schema version {}",
            SCHEMA_VERSION
        );
        apply_initial_schema(pool).await?;
        return Ok(());
    }

    verify_initial_checksum(pool).await?;

    let current_version: i32 =
        sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_optional(pool)
            .await?
            .unwrap_or(0);

    if current_version < SCHEMA_VERSION {
        return Err(SqliteError::MigrationFailed {
            version: SCHEMA_VERSION,
            name: INITIAL_NAME.to_string(),
            error: format!("No upgrade path from schema version {}", current_version),
        });
    }
    if current_version > SCHEMA_VERSION {
        tracing::warn!(
            current_version,
            supported = SCHEMA_VERSION,
            "Database schema is newer than this build"
        );
    } else {
        tracing::debug!(
            "Database schema is up to date (version {})",
            current_version
        );
    }
    Ok(())
}

/// Apply the initial schema (version 1)
async fn apply_initial_schema(pool: &SqlitePool) -> Result<(), SqliteError> {
    let start = std::time::Instant::now();

    let mut tx = pool.begin().await?;

    sqlx::query(SCHEMA).execute(&mut *tx).await?;

    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT INTO schema_version (id, version, applied_at, description) \
         VALUES (1, ?, ?, 'Initial schema')",
    )
    .bind(SCHEMA_VERSION)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let checksum = sha256_hex(SCHEMA);
    let elapsed_ms = start.elapsed().as_millis() as i64;
    sqlx::query(
        "INSERT INTO schema_migrations \
         (version, name, applied_at, checksum, execution_time_ms, success) \
         VALUES (?, ?, ?, ?, ?, 1)",
    )
    .bind(SCHEMA_VERSION)
    .bind(INITIAL_NAME)
    .bind(now)
    .bind(&checksum)
    .bind(elapsed_ms)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!("Applied initial schema in {}ms", elapsed_ms);
    Ok(())
}

/// Warn when the recorded initial schema differs from the compiled one
async fn verify_initial_checksum(pool: &SqlitePool) -> Result<(), SqliteError> {
    let recorded: Option<String> =
        sqlx::query_scalar("SELECT checksum FROM schema_migrations WHERE version = 1")
            .fetch_optional(pool)
            .await?;

    if let Some(recorded) = recorded
        && recorded != sha256_hex(SCHEMA)
    {
        tracing::warn!(
            recorded = %recorded,
            "Initial schema checksum differs from this build; database was created by another version"
        );
    }
    Ok(())
}
