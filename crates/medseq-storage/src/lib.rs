//! # medseq-storage
//!
//! Storage abstraction layer for medseq sequence counters.
//!
//! This crate defines the traits and types that all counter backends must implement.
//! It does not contain any implementations - those are provided by separate crates
//! (`medseq-db-memory`, `medseq-db-postgres`).
//!
//! ## Overview
//!
//! The main trait is [`CounterStore`], which defines the contract for:
//! - Atomic increment-and-fetch
//! - Compare-and-advance (reconciliation with manually entered numbers)
//! - Claim-and-advance for manual reservations
//! - Unconditional overwrite and conditional periodic reset
//! - The issued-number ledger used for collision checks
//!
//! ## Example
//!
//! ```ignore
//! use medseq_storage::{CounterStore, StorageError};
//!
//! async fn reconcile(
//!     store: &dyn CounterStore,
//!     name: &SequenceName,
//!     manual: u64,
//! ) -> Result<u64, StorageError> {
//!     let outcome = store
//!         .compare_and_advance(name, manual, ResetPeriod::Never)
//!         .await?;
//!     Ok(outcome.record().value)
//! }
//! ```
//!
//! ## Storage Backends
//!
//! To implement a storage backend, implement the [`CounterStore`] trait:
//!
//! ```ignore
//! use async_trait::async_trait;
//! use medseq_storage::{CounterStore, StorageError};
//!
//! struct MyStore {
//!     // ...
//! }
//!
//! #[async_trait]
//! impl CounterStore for MyStore {
//!     async fn atomic_increment(
//!         &self,
//!         name: &SequenceName,
//!         period_on_create: ResetPeriod,
//!     ) -> Result<Increment, StorageError> {
//!         // Implementation
//!     }
//!     // ... other methods
//! }
//! ```

mod error;
pub mod evented;
mod traits;
mod types;

// Re-export everything from submodules
pub use error::{ErrorCategory, StorageError};
pub use evented::EventedCounterStore;
pub use traits::CounterStore;
pub use types::{AdvanceOutcome, Increment, IssuedNumber};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared counter store trait object.
pub type DynCounterStore = std::sync::Arc<dyn CounterStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use medseq_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::evented::EventedCounterStore;
    pub use crate::traits::CounterStore;
    pub use crate::types::{AdvanceOutcome, Increment, IssuedNumber};
    pub use crate::{DynCounterStore, StorageResult};
}
