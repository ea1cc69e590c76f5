//! Allocator behaviour when the backing store fails mid-operation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use medseq_allocator::{AllocationError, SequenceAllocator};
use medseq_core::{CounterRecord, IssueOrigin, ResetPeriod, SequenceName};
use medseq_db_memory::InMemoryCounterStore;
use medseq_storage::{AdvanceOutcome, CounterStore, Increment, IssuedNumber, StorageError};
use time::OffsetDateTime;

/// Delegates to an in-memory store, but fails the next `failures` reservations
/// and allocations with a connection error before touching any state.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryCounterStore,
    failures: AtomicUsize,
}

impl FlakyStore {
    fn failing(times: usize) -> Self {
        Self {
            inner: InMemoryCounterStore::new(),
            failures: AtomicUsize::new(times),
        }
    }

    fn trip(&self) -> Result<(), StorageError> {
        let tripped = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(StorageError::connection_error("connection reset by peer"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CounterStore for FlakyStore {
    async fn atomic_increment(
        &self,
        name: &SequenceName,
        period_on_create: ResetPeriod,
    ) -> Result<Increment, StorageError> {
        self.trip()?;
        self.inner.atomic_increment(name, period_on_create).await
    }

    async fn compare_and_advance(
        &self,
        name: &SequenceName,
        candidate: u64,
        period_on_create: ResetPeriod,
    ) -> Result<AdvanceOutcome, StorageError> {
        self.inner
            .compare_and_advance(name, candidate, period_on_create)
            .await
    }

    async fn get(&self, name: &SequenceName) -> Result<Option<CounterRecord>, StorageError> {
        self.inner.get(name).await
    }

    async fn set(
        &self,
        name: &SequenceName,
        value: u64,
        reset_period: Option<ResetPeriod>,
        period_on_create: ResetPeriod,
    ) -> Result<CounterRecord, StorageError> {
        self.inner
            .set(name, value, reset_period, period_on_create)
            .await
    }

    async fn reset_if_stale(
        &self,
        name: &SequenceName,
        period_start: OffsetDateTime,
        value: u64,
    ) -> Result<Option<CounterRecord>, StorageError> {
        self.inner.reset_if_stale(name, period_start, value).await
    }

    async fn list(&self) -> Result<Vec<CounterRecord>, StorageError> {
        self.inner.list().await
    }

    async fn is_issued(&self, name: &SequenceName, value: u64) -> Result<bool, StorageError> {
        self.inner.is_issued(name, value).await
    }

    async fn claim_and_advance(
        &self,
        name: &SequenceName,
        value: u64,
        period_on_create: ResetPeriod,
    ) -> Result<Option<AdvanceOutcome>, StorageError> {
        self.trip()?;
        self.inner
            .claim_and_advance(name, value, period_on_create)
            .await
    }

    async fn issued_numbers(&self, name: &SequenceName) -> Result<Vec<IssuedNumber>, StorageError> {
        self.inner.issued_numbers(name).await
    }

    fn is_shared(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

fn opd() -> SequenceName {
    SequenceName::new("opdNumber").unwrap()
}

#[tokio::test]
async fn failed_reservation_leaves_nothing_behind() {
    let store = Arc::new(FlakyStore::failing(1));
    let allocator = SequenceAllocator::new(store.clone());

    let err = allocator.reserve("opdNumber", 3).await.unwrap_err();
    assert!(matches!(err, AllocationError::StorageUnavailable { .. }));
    assert_eq!(err.status_code(), 503);

    assert!(!store.is_issued(&opd(), 3).await.unwrap());
    assert!(store.get(&opd()).await.unwrap().is_none());

    // The retry succeeds and later allocations start after the reserved number
    allocator.reserve("opdNumber", 3).await.unwrap();
    assert_eq!(allocator.allocate("opdNumber").await.unwrap(), 4);

    let ledger: Vec<(u64, IssueOrigin)> = allocator
        .issued_numbers("opdNumber")
        .await
        .unwrap()
        .into_iter()
        .map(|n| (n.value, n.origin))
        .collect();
    assert_eq!(
        ledger,
        vec![(3, IssueOrigin::Reserved), (4, IssueOrigin::Allocated)]
    );
}

#[tokio::test]
async fn failed_allocation_does_not_consume_a_number() {
    let store = Arc::new(FlakyStore::failing(1));
    let allocator = SequenceAllocator::new(store.clone());

    let err = allocator.allocate("opdNumber").await.unwrap_err();
    assert!(matches!(err, AllocationError::StorageUnavailable { .. }));
    assert_eq!(allocator.current_value("opdNumber").await.unwrap(), 0);

    assert_eq!(allocator.allocate("opdNumber").await.unwrap(), 1);
    assert_eq!(allocator.allocate("opdNumber").await.unwrap(), 2);
}

#[tokio::test]
async fn reissue_after_backwards_reset_is_still_served() {
    let allocator = SequenceAllocator::new(Arc::new(FlakyStore::default()));
    for _ in 0..3 {
        allocator.allocate("opdNumber").await.unwrap();
    }
    allocator.reset("opdNumber", 1, None).await.unwrap();

    // 2 was handed out before the reset; the allocator serves it again
    assert_eq!(allocator.allocate("opdNumber").await.unwrap(), 2);
    assert_eq!(allocator.issued_numbers("opdNumber").await.unwrap().len(), 3);
}
