//! Caller-facing response shapes.

use medseq_core::{CounterRecord, ResetPeriod};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AllocationError;

/// `{ "value": n }` for allocate, peek-next and current-value calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueResponse {
    pub value: u64,
}

impl From<u64> for ValueResponse {
    fn from(value: u64) -> Self {
        Self { value }
    }
}

/// Result of a reservation: `{ "ok": true }` or `{ "ok": false, "reason": "Conflict" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReserveResponse {
    pub fn accepted() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn conflict() -> Self {
        Self {
            ok: false,
            reason: Some("Conflict".to_string()),
        }
    }

    /// Folds a conflict into a negative response. Other errors pass through.
    pub fn from_result(result: Result<(), AllocationError>) -> Result<Self, AllocationError> {
        match result {
            Ok(()) => Ok(Self::accepted()),
            Err(AllocationError::Conflict { .. }) => Ok(Self::conflict()),
            Err(other) => Err(other),
        }
    }
}

/// State of a counter after an administrative reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOutcome {
    pub value: u64,
    pub reset_period: ResetPeriod,
    #[serde(with = "time::serde::rfc3339")]
    pub last_reset: OffsetDateTime,
}

impl From<CounterRecord> for ResetOutcome {
    fn from(record: CounterRecord) -> Self {
        Self {
            value: record.value,
            reset_period: record.reset_period,
            last_reset: record.last_reset,
        }
    }
}
