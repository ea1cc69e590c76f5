use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use medseq_core::{CounterRecord, IssueOrigin, ResetPeriod, SequenceName};
use medseq_storage::{AdvanceOutcome, CounterStore, Increment, IssuedNumber, StorageError};
use time::OffsetDateTime;

/// Map key: the sequence name as a plain string.
pub type StorageKey = String;

type Ledger = BTreeMap<u64, IssuedNumber>;

/// In-memory counter backend built on dashmap.
///
/// Each mutating operation runs while holding the dashmap shard lock for its
/// counter, which makes it atomic with respect to every other operation on
/// the same name. Lock order is always counters before ledgers.
///
/// State lives in this process only, so this backend gives no atomicity
/// across processes. Use it for tests and single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    /// Counter rows keyed by sequence name
    pub(crate) counters: DashMap<StorageKey, CounterRecord>,
    /// Issued-number ledger per sequence name
    pub(crate) ledgers: DashMap<StorageKey, Ledger>,
}

impl InMemoryCounterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with counter rows.
    pub fn with_records(records: impl IntoIterator<Item = CounterRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store
                .counters
                .insert(record.name.as_str().to_owned(), record);
        }
        store
    }

    /// Number of counters currently stored.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Inserts into the ledger unless the number is present. Callers hold the
    /// counter entry lock.
    fn record_issued(&self, name: &SequenceName, value: u64, origin: IssueOrigin) -> bool {
        let mut ledger = self.ledgers.entry(name.as_str().to_owned()).or_default();
        if ledger.contains_key(&value) {
            return false;
        }
        ledger.insert(value, IssuedNumber::new(name.clone(), value, origin));
        true
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn atomic_increment(
        &self,
        name: &SequenceName,
        period_on_create: ResetPeriod,
    ) -> Result<Increment, StorageError> {
        let mut entry = self
            .counters
            .entry(name.as_str().to_owned())
            .or_insert_with(|| CounterRecord::new(name.clone(), period_on_create));

        let next = entry
            .value
            .checked_add(1)
            .ok_or_else(|| StorageError::overflow(name.as_str()))?;
        entry.value = next;
        let recorded = self.record_issued(name, next, IssueOrigin::Allocated);

        Ok(Increment {
            record: entry.clone(),
            reissued: !recorded,
        })
    }

    async fn compare_and_advance(
        &self,
        name: &SequenceName,
        candidate: u64,
        period_on_create: ResetPeriod,
    ) -> Result<AdvanceOutcome, StorageError> {
        let mut entry = self
            .counters
            .entry(name.as_str().to_owned())
            .or_insert_with(|| CounterRecord::new(name.clone(), period_on_create));

        if candidate > entry.value {
            entry.value = candidate;
            Ok(AdvanceOutcome::Advanced(entry.clone()))
        } else {
            Ok(AdvanceOutcome::NotAdvanced(entry.clone()))
        }
    }

    async fn get(&self, name: &SequenceName) -> Result<Option<CounterRecord>, StorageError> {
        Ok(self
            .counters
            .get(name.as_str())
            .map(|entry| entry.value().clone()))
    }

    async fn set(
        &self,
        name: &SequenceName,
        value: u64,
        reset_period: Option<ResetPeriod>,
        period_on_create: ResetPeriod,
    ) -> Result<CounterRecord, StorageError> {
        let mut entry = self
            .counters
            .entry(name.as_str().to_owned())
            .or_insert_with(|| {
                CounterRecord::new(name.clone(), reset_period.unwrap_or(period_on_create))
            });

        entry.value = value;
        entry.last_reset = OffsetDateTime::now_utc();
        if let Some(period) = reset_period {
            entry.reset_period = period;
        }
        Ok(entry.clone())
    }

    async fn reset_if_stale(
        &self,
        name: &SequenceName,
        period_start: OffsetDateTime,
        value: u64,
    ) -> Result<Option<CounterRecord>, StorageError> {
        let Some(mut entry) = self.counters.get_mut(name.as_str()) else {
            return Ok(None);
        };
        if entry.last_reset >= period_start {
            return Ok(None);
        }
        entry.value = value;
        entry.last_reset = OffsetDateTime::now_utc();
        Ok(Some(entry.clone()))
    }

    async fn list(&self) -> Result<Vec<CounterRecord>, StorageError> {
        let mut records: Vec<CounterRecord> = self
            .counters
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    async fn is_issued(&self, name: &SequenceName, value: u64) -> Result<bool, StorageError> {
        Ok(self
            .ledgers
            .get(name.as_str())
            .is_some_and(|ledger| ledger.contains_key(&value)))
    }

    async fn claim_and_advance(
        &self,
        name: &SequenceName,
        value: u64,
        period_on_create: ResetPeriod,
    ) -> Result<Option<AdvanceOutcome>, StorageError> {
        // The counter entry stays locked while the ledger is touched
        match self.counters.entry(name.as_str().to_owned()) {
            Entry::Vacant(vacant) => {
                if !self.record_issued(name, value, IssueOrigin::Reserved) {
                    return Ok(None);
                }
                let record = CounterRecord::new(name.clone(), period_on_create).with_value(value);
                Ok(Some(AdvanceOutcome::Advanced(vacant.insert(record).value().clone())))
            }
            Entry::Occupied(mut occupied) => {
                if !self.record_issued(name, value, IssueOrigin::Reserved) {
                    return Ok(None);
                }
                let record = occupied.get_mut();
                if value > record.value {
                    record.value = value;
                    Ok(Some(AdvanceOutcome::Advanced(record.clone())))
                } else {
                    Ok(Some(AdvanceOutcome::NotAdvanced(record.clone())))
                }
            }
        }
    }

    async fn issued_numbers(&self, name: &SequenceName) -> Result<Vec<IssuedNumber>, StorageError> {
        Ok(self
            .ledgers
            .get(name.as_str())
            .map(|ledger| ledger.values().cloned().collect())
            .unwrap_or_default())
    }

    fn is_shared(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
