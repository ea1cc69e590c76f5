//! Counter row queries.
//!
//! Every mutation is a single statement, so PostgreSQL's row lock on
//! `sequence_counter` serializes concurrent callers for the same name.

use chrono::{DateTime, Utc};
use medseq_core::{CounterRecord, ResetPeriod, SequenceName};
use medseq_storage::{AdvanceOutcome, Increment, StorageError};
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use time::OffsetDateTime;

use super::{COUNTER_COLUMNS, CounterRow, record_from_row, time_to_chrono, to_db_value};
use crate::error::map_sqlx_error;

/// Increments (creating at zero first) and records the issued number.
///
/// The counter upsert and the ledger insert run in one statement. An empty
/// `ledger` result means the number was already recorded.
pub async fn increment(
    pool: &PgPool,
    name: &SequenceName,
    period_on_create: ResetPeriod,
) -> Result<Increment, StorageError> {
    let (row_name, value, reset_period, last_reset, reissued): (
        String,
        i64,
        String,
        DateTime<Utc>,
        bool,
    ) = query_as(
        r#"WITH bumped AS (
               INSERT INTO sequence_counter AS c (name, value, reset_period, last_reset)
               VALUES ($1, 1, $2, now())
               ON CONFLICT (name) DO UPDATE SET value = c.value + 1
               RETURNING c.name, c.value, c.reset_period, c.last_reset
           ), ledger AS (
               INSERT INTO issued_number (name, value, origin)
               SELECT name, value, 'allocated' FROM bumped
               ON CONFLICT (name, value) DO NOTHING
               RETURNING value
           )
           SELECT name, value, reset_period, last_reset,
                  NOT EXISTS (SELECT 1 FROM ledger) AS reissued
           FROM bumped"#,
    )
    .bind(name.as_str())
    .bind(period_on_create.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| map_sqlx_error(name.as_str(), e))?;

    Ok(Increment {
        record: record_from_row((row_name, value, reset_period, last_reset))?,
        reissued,
    })
}

/// Moves the counter to `candidate` if it is strictly greater than the stored value.
pub async fn advance_to(
    pool: &PgPool,
    name: &SequenceName,
    candidate: u64,
    period_on_create: ResetPeriod,
) -> Result<AdvanceOutcome, StorageError> {
    let candidate = to_db_value(name, candidate)?;

    let advanced: Option<CounterRow> = query_as(
        r#"INSERT INTO sequence_counter AS c (name, value, reset_period, last_reset)
           VALUES ($1, $2, $3, now())
           ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value
               WHERE c.value < EXCLUDED.value
           RETURNING c.name, c.value, c.reset_period, c.last_reset"#,
    )
    .bind(name.as_str())
    .bind(candidate)
    .bind(period_on_create.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| map_sqlx_error(name.as_str(), e))?;

    if let Some(row) = advanced {
        return Ok(AdvanceOutcome::Advanced(record_from_row(row)?));
    }

    // The row exists and was already at or past the candidate
    let current = get(pool, name).await?.ok_or_else(|| {
        StorageError::internal(format!("Counter {name} vanished during compare-and-advance"))
    })?;
    Ok(AdvanceOutcome::NotAdvanced(current))
}

/// Reads one counter.
pub async fn get(
    pool: &PgPool,
    name: &SequenceName,
) -> Result<Option<CounterRecord>, StorageError> {
    let sql = format!("SELECT {COUNTER_COLUMNS} FROM sequence_counter WHERE name = $1");
    let row: Option<CounterRow> = query_as(&sql)
        .bind(name.as_str())
        .fetch_optional(pool)
        .await
        .map_err(|e| map_sqlx_error(name.as_str(), e))?;

    row.map(record_from_row).transpose()
}

/// Unconditionally overwrites the value and stamps `last_reset`.
///
/// A created row gets `reset_period`, or `period_on_create` when that is `None`.
pub async fn overwrite(
    pool: &PgPool,
    name: &SequenceName,
    value: u64,
    reset_period: Option<ResetPeriod>,
    period_on_create: ResetPeriod,
) -> Result<CounterRecord, StorageError> {
    let value = to_db_value(name, value)?;

    let row: CounterRow = query_as(
        r#"INSERT INTO sequence_counter AS c (name, value, reset_period, last_reset)
           VALUES ($1, $2, COALESCE($3, $4), now())
           ON CONFLICT (name) DO UPDATE SET
               value = EXCLUDED.value,
               reset_period = COALESCE($3, c.reset_period),
               last_reset = now()
           RETURNING c.name, c.value, c.reset_period, c.last_reset"#,
    )
    .bind(name.as_str())
    .bind(value)
    .bind(reset_period.map(|p| p.as_str()))
    .bind(period_on_create.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| map_sqlx_error(name.as_str(), e))?;

    record_from_row(row)
}

/// Resets the counter only if its last reset predates `period_start`.
pub async fn reset_if_stale(
    pool: &PgPool,
    name: &SequenceName,
    period_start: OffsetDateTime,
    value: u64,
) -> Result<Option<CounterRecord>, StorageError> {
    let value = to_db_value(name, value)?;
    let period_start: DateTime<Utc> = time_to_chrono(period_start)?;

    let sql = format!(
        r#"UPDATE sequence_counter
           SET value = $3, last_reset = now()
           WHERE name = $1 AND last_reset < $2
           RETURNING {COUNTER_COLUMNS}"#
    );
    let row: Option<CounterRow> = query_as(&sql)
        .bind(name.as_str())
        .bind(period_start)
        .bind(value)
        .fetch_optional(pool)
        .await
        .map_err(|e| map_sqlx_error(name.as_str(), e))?;

    row.map(record_from_row).transpose()
}

/// Lists all counters ordered by name.
pub async fn list(pool: &PgPool) -> Result<Vec<CounterRecord>, StorageError> {
    let sql = format!("SELECT {COUNTER_COLUMNS} FROM sequence_counter ORDER BY name");
    let rows: Vec<CounterRow> = query_as(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| map_sqlx_error("*", e))?;

    rows.into_iter().map(record_from_row).collect()
}
