//! SQL query implementations for the PostgreSQL counter backend.
//!
//! - [`counter`]: increment, compare-and-advance, overwrite and periodic reset
//! - [`ledger`]: the issued-number ledger

pub mod counter;
pub mod ledger;

use chrono::{DateTime, Utc};
use medseq_core::{CounterRecord, ResetPeriod, SequenceName};
use medseq_storage::StorageError;
use time::OffsetDateTime;

/// Row shape shared by every counter query: `(name, value, reset_period, last_reset)`.
pub(crate) type CounterRow = (String, i64, String, DateTime<Utc>);

/// Column list matching [`CounterRow`].
pub(crate) const COUNTER_COLUMNS: &str = "name, value, reset_period, last_reset";

/// Converts chrono DateTime to time OffsetDateTime.
pub(crate) fn chrono_to_time(dt: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(dt.timestamp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
        + time::Duration::nanoseconds(i64::from(dt.timestamp_subsec_nanos()))
}

/// Converts time OffsetDateTime to chrono DateTime.
pub(crate) fn time_to_chrono(dt: OffsetDateTime) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond())
        .ok_or_else(|| StorageError::internal(format!("Timestamp out of range: {dt}")))
}

/// Narrows a counter value to the BIGINT column type.
pub(crate) fn to_db_value(name: &SequenceName, value: u64) -> Result<i64, StorageError> {
    i64::try_from(value).map_err(|_| StorageError::overflow(name.as_str()))
}

/// Widens a stored BIGINT back to a counter value.
pub(crate) fn from_db_value(name: &str, value: i64) -> Result<u64, StorageError> {
    u64::try_from(value)
        .map_err(|_| StorageError::invalid_record(name, format!("negative value {value}")))
}

/// Converts a database row to a [`CounterRecord`].
pub(crate) fn record_from_row(row: CounterRow) -> Result<CounterRecord, StorageError> {
    let (name, value, reset_period, last_reset) = row;

    let value = from_db_value(&name, value)?;
    let reset_period: ResetPeriod = reset_period
        .parse()
        .map_err(|e| StorageError::invalid_record(&name, format!("{e}")))?;
    let sequence = SequenceName::new(name.as_str())
        .map_err(|e| StorageError::invalid_record(&name, format!("{e}")))?;

    Ok(CounterRecord::new(sequence, reset_period)
        .with_value(value)
        .with_last_reset(chrono_to_time(last_reset)))
}
