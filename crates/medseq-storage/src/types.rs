//! Core types for the counter storage abstraction layer.

use medseq_core::{CounterRecord, IssueOrigin, SequenceName};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Result of a compare-and-advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The stored value was behind and now equals the candidate.
    Advanced(CounterRecord),
    /// The stored value was already at or beyond the candidate; nothing changed.
    NotAdvanced(CounterRecord),
}

impl AdvanceOutcome {
    /// Returns `true` if the counter moved.
    #[must_use]
    pub fn advanced(&self) -> bool {
        matches!(self, Self::Advanced(_))
    }

    /// The counter state after the operation.
    #[must_use]
    pub fn record(&self) -> &CounterRecord {
        match self {
            Self::Advanced(record) | Self::NotAdvanced(record) => record,
        }
    }

    #[must_use]
    pub fn into_record(self) -> CounterRecord {
        match self {
            Self::Advanced(record) | Self::NotAdvanced(record) => record,
        }
    }
}

/// Result of an atomic increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Increment {
    /// The counter state after the increment.
    pub record: CounterRecord,
    /// `true` if the issued number was already in the ledger. Only possible
    /// after the counter was reset below numbers it had handed out.
    pub reissued: bool,
}

impl Increment {
    /// The number just issued.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.record.value
    }
}

/// One number recorded in a sequence's issued-number ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedNumber {
    pub name: SequenceName,
    pub value: u64,
    pub origin: IssueOrigin,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

impl IssuedNumber {
    /// Creates a ledger entry stamped with the current time.
    #[must_use]
    pub fn new(name: SequenceName, value: u64, origin: IssueOrigin) -> Self {
        Self {
            name,
            value,
            origin,
            issued_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medseq_core::ResetPeriod;

    #[test]
    fn test_advance_outcome_accessors() {
        let record = CounterRecord::new(SequenceName::new("opdNumber").unwrap(), ResetPeriod::Never)
            .with_value(50);

        let advanced = AdvanceOutcome::Advanced(record.clone());
        assert!(advanced.advanced());
        assert_eq!(advanced.record().value, 50);

        let not_advanced = AdvanceOutcome::NotAdvanced(record);
        assert!(!not_advanced.advanced());
        assert_eq!(not_advanced.into_record().value, 50);
    }

    #[test]
    fn test_issued_number_serialization() {
        let entry = IssuedNumber::new(
            SequenceName::new("opdNumber").unwrap(),
            50,
            IssueOrigin::Reserved,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["name"], "opdNumber");
        assert_eq!(json["value"], 50);
        assert_eq!(json["origin"], "reserved");
        assert!(json["issuedAt"].is_string());
    }
}
