//! EventedCounterStore - A store wrapper that emits events after administrative changes.
//!
//! This wrapper delegates all operations to an inner store while publishing
//! [`CounterEvent`]s for resets, reconciliation advances, reservations and
//! periodic resets. Allocations are not published.
//!
//! # Example
//!
//! ```ignore
//! use medseq_storage::EventedCounterStore;
//! use medseq_core::events::EventBroadcaster;
//!
//! let broadcaster = EventBroadcaster::new_shared();
//! let store = EventedCounterStore::new(postgres_store, broadcaster);
//!
//! // After this, a Reset event will be emitted to the broadcaster
//! store.set(&name, 0, None, ResetPeriod::Never).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use medseq_core::events::{CounterEvent, EventBroadcaster};
use medseq_core::{CounterRecord, ResetPeriod, SequenceName};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::StorageError;
use crate::traits::CounterStore;
use crate::types::{AdvanceOutcome, Increment, IssuedNumber};

/// A store wrapper that emits events after successful administrative changes.
///
/// Events are emitted **after** the operation succeeds, so every event
/// corresponds to a change that is actually in the backend.
pub struct EventedCounterStore<S: CounterStore> {
    /// The inner store implementation.
    inner: S,
    /// The event broadcaster.
    broadcaster: Arc<EventBroadcaster>,
}

impl<S: CounterStore> EventedCounterStore<S> {
    /// Create a new evented store wrapper.
    pub fn new(inner: S, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { inner, broadcaster }
    }

    /// Get a reference to the inner store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a reference to the broadcaster.
    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    fn emit(&self, event: CounterEvent) {
        if !self.broadcaster.has_subscribers() {
            return;
        }
        let event_type = event.event_type;
        let sequence = event.sequence.clone();
        let value = event.value;
        let count = self.broadcaster.send(event);
        debug!(
            event_type = %event_type,
            sequence = %sequence,
            value,
            subscribers = count,
            "Emitted counter event"
        );
    }
}

#[async_trait]
impl<S: CounterStore> CounterStore for EventedCounterStore<S> {
    async fn atomic_increment(
        &self,
        name: &SequenceName,
        period_on_create: ResetPeriod,
    ) -> Result<Increment, StorageError> {
        // Allocations are the hot path and don't emit events
        self.inner.atomic_increment(name, period_on_create).await
    }

    async fn compare_and_advance(
        &self,
        name: &SequenceName,
        candidate: u64,
        period_on_create: ResetPeriod,
    ) -> Result<AdvanceOutcome, StorageError> {
        let outcome = self
            .inner
            .compare_and_advance(name, candidate, period_on_create)
            .await?;
        if outcome.advanced() {
            self.emit(CounterEvent::advanced(name.clone(), outcome.record().value));
        }
        Ok(outcome)
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
        let record = self
            .inner
            .set(name, value, reset_period, period_on_create)
            .await?;
        self.emit(CounterEvent::reset(name.clone(), record.value));
        Ok(record)
    }

    async fn reset_if_stale(
        &self,
        name: &SequenceName,
        period_start: OffsetDateTime,
        value: u64,
    ) -> Result<Option<CounterRecord>, StorageError> {
        let result = self.inner.reset_if_stale(name, period_start, value).await?;
        if let Some(record) = &result {
            self.emit(CounterEvent::periodic_reset(name.clone(), record.value));
        }
        Ok(result)
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
        let outcome = self
            .inner
            .claim_and_advance(name, value, period_on_create)
            .await?;
        if let Some(outcome) = &outcome {
            self.emit(CounterEvent::reserved(name.clone(), value));
            if outcome.advanced() {
                self.emit(CounterEvent::advanced(name.clone(), outcome.record().value));
            }
        }
        Ok(outcome)
    }

    async fn issued_numbers(&self, name: &SequenceName) -> Result<Vec<IssuedNumber>, StorageError> {
        self.inner.issued_numbers(name).await
    }

    fn is_shared(&self) -> bool {
        self.inner.is_shared()
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

impl<S: CounterStore> std::fmt::Debug for EventedCounterStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventedCounterStore")
            .field("backend", &self.inner.backend_name())
            .field("subscriber_count", &self.broadcaster.subscriber_count())
            .finish()
    }
}
