//! In-memory counter backend for medseq.
//!
//! This crate provides an in-memory implementation of the `CounterStore` trait
//! from `medseq-storage`, using dashmap for concurrent access.
//!
//! Counter state is process-local: two processes each holding an
//! `InMemoryCounterStore` will hand out the same numbers. Use the PostgreSQL
//! backend whenever more than one process allocates from a sequence.
//!
//! # Example
//!
//! ```ignore
//! use medseq_db_memory::InMemoryCounterStore;
//! use medseq_storage::CounterStore;
//!
//! let store = InMemoryCounterStore::new();
//! let name = SequenceName::new("opdNumber")?;
//! let issued = store.atomic_increment(&name, ResetPeriod::Yearly).await?;
//! assert_eq!(issued.value(), 1);
//! ```

pub mod storage;

// Re-export the CounterStore trait for convenience
pub use medseq_storage::{CounterStore, StorageError};

pub use storage::{InMemoryCounterStore, StorageKey};

/// Type alias for a shareable CounterStore instance.
pub type DynCounterStore = std::sync::Arc<dyn CounterStore>;

/// Creates a new in-memory CounterStore instance.
pub fn create_counter_store() -> DynCounterStore {
    std::sync::Arc::new(InMemoryCounterStore::new())
}
