use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::SequenceName;
use crate::error::{CoreError, Result};

/// How often a sequence starts over from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResetPeriod {
    Yearly,
    Monthly,
    #[default]
    Never,
}

impl ResetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetPeriod::Yearly => "yearly",
            ResetPeriod::Monthly => "monthly",
            ResetPeriod::Never => "never",
        }
    }

    /// Start of the period containing `now`, or `None` for sequences that never reset.
    pub fn period_start(&self, now: OffsetDateTime) -> Result<Option<OffsetDateTime>> {
        match self {
            ResetPeriod::Yearly => crate::time::start_of_year(now).map(Some),
            ResetPeriod::Monthly => crate::time::start_of_month(now).map(Some),
            ResetPeriod::Never => Ok(None),
        }
    }

    /// Whether a counter last reset at `last_reset` has crossed a period boundary by `now`.
    pub fn is_due(&self, last_reset: OffsetDateTime, now: OffsetDateTime) -> Result<bool> {
        Ok(self
            .period_start(now)?
            .is_some_and(|start| last_reset < start))
    }
}

impl fmt::Display for ResetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResetPeriod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yearly" => Ok(ResetPeriod::Yearly),
            "monthly" => Ok(ResetPeriod::Monthly),
            "never" => Ok(ResetPeriod::Never),
            other => Err(CoreError::invalid_reset_period(other)),
        }
    }
}

/// Persisted state of one named counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterRecord {
    pub name: SequenceName,
    /// Last issued number; 0 before the first allocation.
    pub value: u64,
    pub reset_period: ResetPeriod,
    #[serde(with = "time::serde::rfc3339")]
    pub last_reset: OffsetDateTime,
}

impl CounterRecord {
    /// Fresh counter at zero, stamped with the current time.
    pub fn new(name: SequenceName, reset_period: ResetPeriod) -> Self {
        Self {
            name,
            value: 0,
            reset_period,
            last_reset: crate::time::now_utc(),
        }
    }

    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    pub fn with_last_reset(mut self, last_reset: OffsetDateTime) -> Self {
        self.last_reset = last_reset;
        self
    }

    /// Advisory next number. Not reserved.
    pub fn next_value(&self) -> u64 {
        self.value.saturating_add(1)
    }

    pub fn is_reset_due(&self, now: OffsetDateTime) -> Result<bool> {
        self.reset_period.is_due(self.last_reset, now)
    }
}

/// Where an issued number came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueOrigin {
    /// Drawn from the counter by an allocation.
    Allocated,
    /// Supplied manually and registered through a reservation.
    Reserved,
}

impl IssueOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueOrigin::Allocated => "allocated",
            IssueOrigin::Reserved => "reserved",
        }
    }
}

impl fmt::Display for IssueOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueOrigin {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "allocated" => Ok(IssueOrigin::Allocated),
            "reserved" => Ok(IssueOrigin::Reserved),
            other => Err(CoreError::invalid_value(format!("unknown issue origin '{other}'"))),
        }
    }
}
