//! # medseq-allocator
//!
//! Collision-free sequence numbers for hospital record numbering (OPD/IPD).
//!
//! [`SequenceAllocator`] hands out unique, increasing integers per named
//! sequence on top of any [`CounterStore`](medseq_storage::CounterStore).
//! It also accepts manually keyed numbers (reservations) and reconciles the
//! counter with them, and it exposes administrative resets and best-effort
//! batch seeding.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use medseq_allocator::SequenceAllocator;
//! use medseq_db_memory::InMemoryCounterStore;
//!
//! let allocator = SequenceAllocator::new(Arc::new(InMemoryCounterStore::new()));
//! assert_eq!(allocator.allocate("opdNumber").await?, 1);
//! allocator.reserve("opdNumber", 50).await?;
//! assert_eq!(allocator.allocate("opdNumber").await?, 51);
//! ```
//!
//! The in-memory store is only correct for a single process. Deployments
//! with several processes must point every process at the same PostgreSQL
//! database.

pub mod allocator;
pub mod batch;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod observability;
pub mod responses;
pub mod sweeper;

pub use allocator::SequenceAllocator;
pub use batch::{BatchEntry, BatchFailure, BatchOutcome};
pub use bootstrap::{AllocatorRuntime, BootstrapError};
pub use config::{AllocatorConfig, ConfigError};
pub use error::{AllocationError, ErrorCategory, Result};
pub use responses::{ReserveResponse, ResetOutcome, ValueResponse};
pub use sweeper::{ResetSweeper, SweeperHandle};

// Re-export domain types callers need alongside the allocator
pub use medseq_core::{CounterRecord, ResetPeriod, SequenceName};
