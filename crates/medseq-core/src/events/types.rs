//! Event types for administrative counter changes.
//!
//! Allocations are the hot path and are never broadcast. Only the changes an
//! auditor cares about are: resets, reconciliation advances, manual
//! reservations and scheduled period resets.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::SequenceName;

/// Kind of administrative change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterEventType {
    /// Value overwritten by an administrative reset or seed
    Reset,
    /// Value moved forward to catch up with a manually reserved number
    Advanced,
    /// A manually supplied number was registered as used
    Reserved,
    /// Value reset because a yearly/monthly boundary was crossed
    PeriodicReset,
}

impl CounterEventType {
    /// Returns the string representation of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterEventType::Reset => "reset",
            CounterEventType::Advanced => "advanced",
            CounterEventType::Reserved => "reserved",
            CounterEventType::PeriodicReset => "periodic_reset",
        }
    }
}

impl std::fmt::Display for CounterEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event describing one administrative change to a counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterEvent {
    pub event_type: CounterEventType,
    pub sequence: SequenceName,
    /// Counter value (or reserved number) after the change
    pub value: u64,
    /// Timestamp of the event
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl CounterEvent {
    pub fn new(event_type: CounterEventType, sequence: SequenceName, value: u64) -> Self {
        Self {
            event_type,
            sequence,
            value,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn reset(sequence: SequenceName, value: u64) -> Self {
        Self::new(CounterEventType::Reset, sequence, value)
    }

    pub fn advanced(sequence: SequenceName, value: u64) -> Self {
        Self::new(CounterEventType::Advanced, sequence, value)
    }

    pub fn reserved(sequence: SequenceName, value: u64) -> Self {
        Self::new(CounterEventType::Reserved, sequence, value)
    }

    pub fn periodic_reset(sequence: SequenceName, value: u64) -> Self {
        Self::new(CounterEventType::PeriodicReset, sequence, value)
    }
}
