//! Issued-number ledger queries.

use chrono::{DateTime, Utc};
use medseq_core::{IssueOrigin, ResetPeriod, SequenceName};
use medseq_storage::{AdvanceOutcome, IssuedNumber, StorageError};
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;

use super::{chrono_to_time, counter, from_db_value, record_from_row, to_db_value};
use crate::error::map_sqlx_error;

/// Returns `true` if the number is in the ledger.
pub async fn contains(
    pool: &PgPool,
    name: &SequenceName,
    value: u64,
) -> Result<bool, StorageError> {
    // Nothing beyond BIGINT can ever have been stored
    let Ok(value) = to_db_value(name, value) else {
        return Ok(false);
    };

    query_scalar("SELECT EXISTS (SELECT 1 FROM issued_number WHERE name = $1 AND value = $2)")
        .bind(name.as_str())
        .bind(value)
        .fetch_one(pool)
        .await
        .map_err(|e| map_sqlx_error(name.as_str(), e))
}

/// Row shape of [`claim_and_advance`]: the claim flag plus the advanced
/// counter, if the counter moved.
type ClaimRow = (
    bool,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<DateTime<Utc>>,
);

/// Inserts a reserved number and advances the counter to it, in one statement.
///
/// Returns `None` if the number was already in the ledger, in which case the
/// counter is untouched.
pub async fn claim_and_advance(
    pool: &PgPool,
    name: &SequenceName,
    value: u64,
    period_on_create: ResetPeriod,
) -> Result<Option<AdvanceOutcome>, StorageError> {
    let db_value = to_db_value(name, value)?;

    let (claimed, row_name, row_value, reset_period, last_reset): ClaimRow = query_as(
        r#"WITH claimed AS (
               INSERT INTO issued_number (name, value, origin)
               VALUES ($1, $2, 'reserved')
               ON CONFLICT (name, value) DO NOTHING
               RETURNING name, value
           ), advanced AS (
               INSERT INTO sequence_counter AS c (name, value, reset_period, last_reset)
               SELECT name, value, $3, now() FROM claimed
               ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value
                   WHERE c.value < EXCLUDED.value
               RETURNING c.name, c.value, c.reset_period, c.last_reset
           )
           SELECT EXISTS (SELECT 1 FROM claimed),
                  a.name, a.value, a.reset_period, a.last_reset
           FROM (SELECT 1) AS one
           LEFT JOIN advanced a ON true"#,
    )
    .bind(name.as_str())
    .bind(db_value)
    .bind(period_on_create.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| map_sqlx_error(name.as_str(), e))?;

    if !claimed {
        return Ok(None);
    }

    if let (Some(row_name), Some(row_value), Some(reset_period), Some(last_reset)) =
        (row_name, row_value, reset_period, last_reset)
    {
        let record = record_from_row((row_name, row_value, reset_period, last_reset))?;
        return Ok(Some(AdvanceOutcome::Advanced(record)));
    }

    // Claimed, but the counter was already at or past the number
    let current = counter::get(pool, name).await?.ok_or_else(|| {
        StorageError::internal(format!("Counter {name} vanished during reservation"))
    })?;
    Ok(Some(AdvanceOutcome::NotAdvanced(current)))
}

/// Returns the ledger of one sequence ordered by value.
pub async fn list(pool: &PgPool, name: &SequenceName) -> Result<Vec<IssuedNumber>, StorageError> {
    let rows: Vec<(i64, String, DateTime<Utc>)> = query_as(
        r#"SELECT value, origin, issued_at
           FROM issued_number
           WHERE name = $1
           ORDER BY value"#,
    )
    .bind(name.as_str())
    .fetch_all(pool)
    .await
    .map_err(|e| map_sqlx_error(name.as_str(), e))?;

    rows.into_iter()
        .map(|(value, origin, issued_at)| {
            let origin: IssueOrigin = origin
                .parse()
                .map_err(|e| StorageError::invalid_record(name.as_str(), format!("{e}")))?;
            Ok(IssuedNumber {
                name: name.clone(),
                value: from_db_value(name.as_str(), value)?,
                origin,
                issued_at: chrono_to_time(issued_at),
            })
        })
        .collect()
}
