//! Storage traits for the counter storage abstraction layer.
//!
//! This module defines the contract every counter backend must implement.

use async_trait::async_trait;
use medseq_core::{CounterRecord, ResetPeriod, SequenceName};
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::types::{AdvanceOutcome, Increment, IssuedNumber};

/// The storage trait that all counter backends must implement.
///
/// Every mutating method is a single atomic operation against the backend:
/// it either fully applies or leaves the counter exactly as it was. None of
/// them may be emulated with a read followed by a conditional write.
///
/// Besides the counter rows, a backend keeps an issued-number ledger per
/// sequence: every number handed out by [`atomic_increment`] and every
/// number accepted by [`claim_and_advance`]. The ledger is what collision checks consult,
/// because the counter value alone lags behind manually entered numbers.
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use medseq_storage::{CounterStore, StorageError};
///
/// async fn next_opd(store: &dyn CounterStore) -> Result<u64, StorageError> {
///     let name = SequenceName::new("opdNumber")?;
///     let issued = store.atomic_increment(&name, ResetPeriod::Yearly).await?;
///     Ok(issued.value())
/// }
/// ```
///
/// [`atomic_increment`]: CounterStore::atomic_increment
/// [`claim_and_advance`]: CounterStore::claim_and_advance
#[async_trait]
pub trait CounterStore: Send + Sync {
    // ==================== Counter ====================

    /// Increments the counter by one and returns the new state.
    ///
    /// Creates the counter at zero first (with `period_on_create`) if it does
    /// not exist. The issued number is recorded in the ledger in the same
    /// atomic step. A number that is already in the ledger is still issued
    /// and reported through [`Increment::reissued`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Overflow` if the counter is at `u64::MAX`.
    async fn atomic_increment(
        &self,
        name: &SequenceName,
        period_on_create: ResetPeriod,
    ) -> Result<Increment, StorageError>;

    /// Moves the counter to `candidate` only if `candidate` is greater than the
    /// stored value at apply time. Creates the counter (with `period_on_create`)
    /// if missing.
    async fn compare_and_advance(
        &self,
        name: &SequenceName,
        candidate: u64,
        period_on_create: ResetPeriod,
    ) -> Result<AdvanceOutcome, StorageError>;

    /// Reads a counter. Never creates it.
    async fn get(&self, name: &SequenceName) -> Result<Option<CounterRecord>, StorageError>;

    /// Unconditionally overwrites the counter value and stamps `last_reset`.
    ///
    /// When `reset_period` is `None` an existing counter keeps its period and a
    /// new one gets `period_on_create`.
    async fn set(
        &self,
        name: &SequenceName,
        value: u64,
        reset_period: Option<ResetPeriod>,
        period_on_create: ResetPeriod,
    ) -> Result<CounterRecord, StorageError>;

    /// Resets the counter to `value` only if it was last reset before
    /// `period_start`. Returns `None` when the counter is missing or not due.
    async fn reset_if_stale(
        &self,
        name: &SequenceName,
        period_start: OffsetDateTime,
        value: u64,
    ) -> Result<Option<CounterRecord>, StorageError>;

    /// Lists all counters ordered by name.
    async fn list(&self) -> Result<Vec<CounterRecord>, StorageError>;

    // ==================== Ledger ====================

    /// Returns `true` if `value` was ever issued or reserved for `name`.
    async fn is_issued(&self, name: &SequenceName, value: u64) -> Result<bool, StorageError>;

    /// Registers a manually supplied number and advances the counter to it if
    /// the counter is behind, as one atomic step.
    ///
    /// Returns `None` (and changes nothing) if the number is already in the
    /// ledger. On error neither the ledger nor the counter has changed.
    async fn claim_and_advance(
        &self,
        name: &SequenceName,
        value: u64,
        period_on_create: ResetPeriod,
    ) -> Result<Option<AdvanceOutcome>, StorageError>;

    /// Returns the ledger of a sequence ordered by value.
    async fn issued_numbers(&self, name: &SequenceName) -> Result<Vec<IssuedNumber>, StorageError>;

    // ==================== Metadata ====================

    /// Whether separate processes using this backend share counter state.
    ///
    /// Only shared backends give global atomicity under horizontal scaling.
    fn is_shared(&self) -> bool;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
