//! The sequence allocator.

use std::collections::HashMap;
use std::sync::Arc;

use medseq_core::{CounterRecord, ResetPeriod, SequenceName};
use medseq_storage::{DynCounterStore, IssuedNumber};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::batch::{BatchEntry, BatchOutcome, raw_entry_name};
use crate::error::{AllocationError, Result};
use crate::responses::ResetOutcome;

/// Issues unique, increasing numbers per named sequence.
///
/// Every counter mutation is one atomic call on the injected
/// [`CounterStore`](medseq_storage::CounterStore);
/// the allocator itself holds no counter state. Sequences need no
/// registration: an unknown name behaves as a counter at zero.
///
/// Cloning is cheap and clones share the store.
#[derive(Clone)]
pub struct SequenceAllocator {
    store: DynCounterStore,
    periods: Arc<HashMap<SequenceName, ResetPeriod>>,
}

impl SequenceAllocator {
    /// Creates an allocator over `store`. Every sequence defaults to [`ResetPeriod::Never`].
    pub fn new(store: DynCounterStore) -> Self {
        Self {
            store,
            periods: Arc::new(HashMap::new()),
        }
    }

    /// Sets the reset periods given to counters when they are first created.
    #[must_use]
    pub fn with_periods(
        mut self,
        periods: impl IntoIterator<Item = (SequenceName, ResetPeriod)>,
    ) -> Self {
        self.periods = Arc::new(periods.into_iter().collect());
        self
    }

    /// The backing store.
    pub fn store(&self) -> &DynCounterStore {
        &self.store
    }

    /// Reset period a counter is created with when it does not exist yet.
    pub fn period_for(&self, name: &SequenceName) -> ResetPeriod {
        self.periods.get(name).copied().unwrap_or_default()
    }

    /// Draws the next number from `name`, creating the counter at zero if needed.
    ///
    /// Concurrent callers always observe distinct, contiguous values.
    /// A storage failure is returned as-is and never retried.
    #[instrument(skip(self), fields(backend = self.store.backend_name()))]
    pub async fn allocate(&self, name: &str) -> Result<u64> {
        let name = SequenceName::new(name)?;
        let issued = self
            .store
            .atomic_increment(&name, self.period_for(&name))
            .await?;
        if issued.reissued {
            warn!(
                sequence = %name,
                value = issued.value(),
                "Issued a number that was already in use; the counter was reset below it"
            );
        } else {
            debug!(sequence = %name, value = issued.value(), "Allocated number");
        }
        Ok(issued.value())
    }

    /// The last issued number, or 0 for an unknown sequence. Never creates a counter.
    pub async fn current_value(&self, name: &str) -> Result<u64> {
        let name = SequenceName::new(name)?;
        Ok(self
            .store
            .get(&name)
            .await?
            .map(|record| record.value)
            .unwrap_or(0))
    }

    /// The number the next allocation would return if nothing else ran first.
    ///
    /// Advisory only: the value is not held for the caller.
    pub async fn peek_next(&self, name: &str) -> Result<u64> {
        let name = SequenceName::new(name)?;
        Ok(self
            .store
            .get(&name)
            .await?
            .map(|record| record.next_value())
            .unwrap_or(1))
    }

    /// Registers a manually keyed number as used.
    ///
    /// Fails with [`AllocationError::Conflict`] if the number was already
    /// allocated or reserved. On success the counter is advanced to `explicit`
    /// if it is behind, so later allocations never hand out a number at or
    /// below it.
    ///
    /// The ledger entry and the counter advance are one atomic store call, so
    /// two simultaneous reservations of the same number resolve to exactly one
    /// success, and a failed call leaves nothing behind.
    #[instrument(skip(self), fields(backend = self.store.backend_name()))]
    pub async fn reserve(&self, name: &str, explicit: i64) -> Result<()> {
        let name = SequenceName::new(name)?;
        let value = to_counter_value(explicit)?;
        if value == 0 {
            return Err(AllocationError::validation("Reserved numbers start at 1"));
        }

        let Some(outcome) = self
            .store
            .claim_and_advance(&name, value, self.period_for(&name))
            .await?
        else {
            info!(sequence = %name, value, "Reservation rejected: number already in use");
            return Err(AllocationError::conflict(name.as_str(), value));
        };

        info!(
            sequence = %name,
            value,
            advanced = outcome.advanced(),
            counter = outcome.record().value,
            "Reserved number"
        );
        Ok(())
    }

    /// Unconditionally sets the counter to `to_value` and stamps `last_reset`.
    ///
    /// A counter created here gets `new_period`, or the configured period of
    /// the sequence. An existing counter keeps its period unless `new_period`
    /// is given. Nothing stops `to_value` from being below numbers already
    /// issued; those numbers will be handed out again.
    #[instrument(skip(self), fields(backend = self.store.backend_name()))]
    pub async fn reset(
        &self,
        name: &str,
        to_value: i64,
        new_period: Option<ResetPeriod>,
    ) -> Result<ResetOutcome> {
        let name = SequenceName::new(name)?;
        let value = to_counter_value(to_value)?;

        let previous = self.store.get(&name).await?.map(|r| r.value);
        let record = self
            .store
            .set(&name, value, new_period, self.period_for(&name))
            .await?;

        if let Some(previous) = previous
            && value < previous
        {
            warn!(
                sequence = %name,
                previous,
                value,
                "Counter moved backwards; numbers up to the previous value may be reissued"
            );
        } else {
            info!(sequence = %name, value, "Counter reset");
        }

        Ok(record.into())
    }

    /// Applies [`reset`](Self::reset) to each entry independently.
    ///
    /// The result has one outcome per entry, in order. Earlier successes are
    /// kept when a later entry fails.
    pub async fn batch_set(&self, entries: &[BatchEntry]) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            let outcome = match self
                .reset(&entry.name, entry.value, entry.reset_period)
                .await
            {
                Ok(reset) => BatchOutcome::success(&entry.name, reset.value),
                Err(e) => {
                    warn!(sequence = %entry.name, error = %e, "Batch entry failed");
                    BatchOutcome::failure(&entry.name, &e)
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Like [`batch_set`](Self::batch_set) for untyped input: an entry that
    /// does not parse fails on its own.
    pub async fn batch_set_json(&self, raw: &[Value]) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(raw.len());
        for item in raw {
            let outcome = match BatchEntry::from_json(item) {
                Ok(entry) => match self
                    .reset(&entry.name, entry.value, entry.reset_period)
                    .await
                {
                    Ok(reset) => BatchOutcome::success(entry.name, reset.value),
                    Err(e) => BatchOutcome::failure(entry.name, &e),
                },
                Err(e) => {
                    warn!(error = %e, "Malformed batch entry");
                    BatchOutcome::failure(raw_entry_name(item), &e)
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// All counters, ordered by name.
    pub async fn list(&self) -> Result<Vec<CounterRecord>> {
        Ok(self.store.list().await?)
    }

    /// Every number allocated or reserved for `name`, ordered by value.
    pub async fn issued_numbers(&self, name: &str) -> Result<Vec<IssuedNumber>> {
        let name = SequenceName::new(name)?;
        Ok(self.store.issued_numbers(&name).await?)
    }

    /// Resets `name` to zero if a period boundary was crossed since its last reset.
    ///
    /// Returns the new state when a reset happened. Safe to call from several
    /// processes at once: the reset applies at most once per boundary.
    #[instrument(skip(self))]
    pub async fn reset_if_due(
        &self,
        name: &str,
        now: OffsetDateTime,
    ) -> Result<Option<CounterRecord>> {
        let name = SequenceName::new(name)?;
        let Some(record) = self.store.get(&name).await? else {
            return Ok(None);
        };
        if !record.is_reset_due(now)? {
            return Ok(None);
        }
        let Some(period_start) = record.reset_period.period_start(now)? else {
            return Ok(None);
        };

        let reset = self.store.reset_if_stale(&name, period_start, 0).await?;
        if let Some(reset) = &reset {
            info!(
                sequence = %name,
                period = %reset.reset_period.as_str(),
                previous = record.value,
                "Periodic reset applied"
            );
        }
        Ok(reset)
    }

    /// Runs [`reset_if_due`](Self::reset_if_due) over every counter.
    ///
    /// Failures on one counter are logged and do not stop the others.
    pub async fn reset_all_due(&self, now: OffsetDateTime) -> Result<Vec<CounterRecord>> {
        let mut reset = Vec::new();
        for record in self.store.list().await? {
            match self.reset_if_due(record.name.as_str(), now).await {
                Ok(Some(updated)) => reset.push(updated),
                Ok(None) => {}
                Err(e) => warn!(sequence = %record.name, error = %e, "Periodic reset failed"),
            }
        }
        Ok(reset)
    }
}

impl std::fmt::Debug for SequenceAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceAllocator")
            .field("backend", &self.store.backend_name())
            .field("shared", &self.store.is_shared())
            .field("periods", &self.periods)
            .finish()
    }
}

fn to_counter_value(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| {
        AllocationError::validation(format!("Value must not be negative, got {value}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use medseq_db_memory::InMemoryCounterStore;
    use time::macros::datetime;

    fn allocator() -> SequenceAllocator {
        SequenceAllocator::new(Arc::new(InMemoryCounterStore::new()))
    }

    #[tokio::test]
    async fn test_invalid_names_are_rejected() {
        let allocator = allocator();
        for bad in ["", "opd number", "opd/number"] {
            let err = allocator.allocate(bad).await.unwrap_err();
            assert!(err.is_validation(), "{bad:?} should be rejected");
        }
        assert!(allocator.current_value("").await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_negative_values_are_rejected() {
        let allocator = allocator();
        assert!(allocator.reserve("opdNumber", -1).await.unwrap_err().is_validation());
        assert!(allocator.reserve("opdNumber", 0).await.unwrap_err().is_validation());
        assert!(
            allocator
                .reset("opdNumber", -5, None)
                .await
                .unwrap_err()
                .is_validation()
        );
        // Rejected input leaves no counter behind
        assert!(allocator.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_configured_period_applies_on_creation() {
        let allocator = allocator().with_periods([(
            SequenceName::new("opdNumber").unwrap(),
            ResetPeriod::Yearly,
        )]);

        allocator.allocate("opdNumber").await.unwrap();
        allocator.allocate("ipdNumber").await.unwrap();

        let records = allocator.list().await.unwrap();
        assert_eq!(records[0].name.as_str(), "ipdNumber");
        assert_eq!(records[0].reset_period, ResetPeriod::Never);
        assert_eq!(records[1].name.as_str(), "opdNumber");
        assert_eq!(records[1].reset_period, ResetPeriod::Yearly);
    }

    #[tokio::test]
    async fn test_reset_creates_with_configured_period() {
        let allocator = allocator().with_periods([
            (SequenceName::new("opdNumber").unwrap(), ResetPeriod::Yearly),
            (SequenceName::new("ipdNumber").unwrap(), ResetPeriod::Yearly),
        ]);

        let created = allocator.reset("opdNumber", 100, None).await.unwrap();
        assert_eq!(created.reset_period, ResetPeriod::Yearly);

        // An explicit period wins on creation and sticks on later resets
        let created = allocator
            .reset("ipdNumber", 5, Some(ResetPeriod::Monthly))
            .await
            .unwrap();
        assert_eq!(created.reset_period, ResetPeriod::Monthly);
        let kept = allocator.reset("ipdNumber", 0, None).await.unwrap();
        assert_eq!(kept.reset_period, ResetPeriod::Monthly);

        let unconfigured = allocator.reset("labNumber", 1, None).await.unwrap();
        assert_eq!(unconfigured.reset_period, ResetPeriod::Never);
    }

    #[tokio::test]
    async fn test_reserve_below_counter_does_not_move_it() {
        let allocator = allocator();
        for _ in 0..10 {
            allocator.allocate("opdNumber").await.unwrap();
        }

        // 7 was allocated already
        assert!(allocator.reserve("opdNumber", 7).await.unwrap_err().is_conflict());

        // A gap left by a reset can be reserved without moving the counter
        allocator.reset("ipdNumber", 20, None).await.unwrap();
        allocator.reserve("ipdNumber", 3).await.unwrap();
        assert_eq!(allocator.current_value("ipdNumber").await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_reset_if_due_crosses_boundary_once() {
        let store = Arc::new(InMemoryCounterStore::with_records([CounterRecord::new(
            SequenceName::new("opdNumber").unwrap(),
            ResetPeriod::Yearly,
        )
        .with_value(812)
        .with_last_reset(datetime!(2024-01-01 00:00 UTC))]));
        let allocator = SequenceAllocator::new(store);

        let within = datetime!(2024-12-31 23:59 UTC);
        assert!(allocator.reset_if_due("opdNumber", within).await.unwrap().is_none());

        let next_year = datetime!(2025-01-01 00:05 UTC);
        let reset = allocator.reset_if_due("opdNumber", next_year).await.unwrap();
        assert_eq!(reset.map(|r| r.value), Some(0));

        assert!(allocator.reset_if_due("opdNumber", next_year).await.unwrap().is_none());
        assert_eq!(allocator.allocate("opdNumber").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_never_period_is_not_reset() {
        let allocator = allocator();
        allocator.allocate("labNumber").await.unwrap();
        let far_future = datetime!(2999-06-01 00:00 UTC);
        assert!(allocator.reset_if_due("labNumber", far_future).await.unwrap().is_none());
        assert!(allocator.reset_if_due("unknown", far_future).await.unwrap().is_none());
        assert_eq!(allocator.current_value("labNumber").await.unwrap(), 1);
    }
}
