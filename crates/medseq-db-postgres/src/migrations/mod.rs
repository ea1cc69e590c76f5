//! Database migration management for the PostgreSQL counter backend.
//!
//! Migrations are embedded in the binary so a deployment needs no SQL files
//! on disk. Applied versions are tracked in `_sqlx_migrations`.

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_postgres::PgPool;
use std::borrow::Cow;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

/// Embedded migrations in chronological order: `(version, description, sql)`.
macro_rules! embedded_migrations {
    () => {
        &[(
            20250301000001i64,
            "sequence_counters",
            include_str!("../../migrations/20250301000001_sequence_counters.sql"),
        )]
    };
}

fn build_migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Number of migrations compiled into this binary.
pub fn embedded_count() -> usize {
    embedded_migrations!().len()
}

/// Applies all pending migrations.
///
/// Safe to call from several processes at once: the migrator takes an
/// advisory lock before touching the schema.
///
/// # Errors
///
/// Returns `PostgresError::Migration` if a migration fails to execute.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running embedded counter migrations");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| PostgresError::Migration(format!("Migration failed: {e}")))?;

    info!("Counter migrations applied");

    Ok(())
}
