//! Best-effort batch seeding.
//!
//! Each entry is applied on its own; one bad entry never aborts or rolls back
//! the others.

use medseq_core::ResetPeriod;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AllocationError, ErrorCategory};

/// One `{ name, value, resetPeriod? }` seeding entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub name: String,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_period: Option<ResetPeriod>,
}

impl BatchEntry {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
            reset_period: None,
        }
    }

    #[must_use]
    pub fn with_reset_period(mut self, period: ResetPeriod) -> Self {
        self.reset_period = Some(period);
        self
    }

    /// Parses an untyped entry, reporting the first malformed field.
    pub fn from_json(raw: &Value) -> Result<Self, AllocationError> {
        let object = raw
            .as_object()
            .ok_or_else(|| AllocationError::validation("Batch entry must be an object"))?;

        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AllocationError::validation("Batch entry is missing a string name"))?;

        let value = match object.get("value") {
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                AllocationError::validation(format!("Value {n} for {name} is not an integer"))
            })?,
            Some(other) => {
                return Err(AllocationError::validation(format!(
                    "Value {other} for {name} is not an integer"
                )));
            }
            None => {
                return Err(AllocationError::validation(format!(
                    "Batch entry for {name} is missing a value"
                )));
            }
        };

        let reset_period = match object.get("resetPeriod") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.parse::<ResetPeriod>()?),
            Some(other) => {
                return Err(AllocationError::validation(format!(
                    "Reset period {other} for {name} is not a string"
                )));
            }
        };

        Ok(Self {
            name: name.to_string(),
            value,
            reset_period,
        })
    }
}

/// Why a batch entry failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub category: ErrorCategory,
    pub message: String,
}

impl From<&AllocationError> for BatchFailure {
    fn from(err: &AllocationError) -> Self {
        Self {
            category: err.category(),
            message: err.to_string(),
        }
    }
}

/// Per-entry result: `{ name, ok, value }` or `{ name, ok, error }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchFailure>,
}

impl BatchOutcome {
    pub fn success(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            ok: true,
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(name: impl Into<String>, err: &AllocationError) -> Self {
        Self {
            name: name.into(),
            ok: false,
            value: None,
            error: Some(err.into()),
        }
    }

    /// Category of the failure, if any.
    pub fn error_category(&self) -> Option<ErrorCategory> {
        self.error.as_ref().map(|e| e.category)
    }
}

/// Best-effort name of a raw entry, for reporting.
pub(crate) fn raw_entry_name(raw: &Value) -> String {
    raw.get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
