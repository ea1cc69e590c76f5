//! Builds a ready-to-use allocator from configuration.

use std::sync::Arc;

use medseq_core::events::EventBroadcaster;
use medseq_db_memory::InMemoryCounterStore;
use medseq_db_postgres::PostgresCounterStore;
use medseq_storage::{DynCounterStore, EventedCounterStore, StorageError};
use tracing::{info, warn};

use crate::allocator::SequenceAllocator;
use crate::config::{AllocatorConfig, ConfigError, StorageBackend};
use crate::sweeper::{ResetSweeper, SweeperHandle};

/// Errors raised while assembling the allocator.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("storage initialization failed: {0}")]
    Storage(#[from] StorageError),
}

/// A running allocator with its event bus and optional sweeper.
pub struct AllocatorRuntime {
    pub allocator: SequenceAllocator,
    /// Administrative counter events (resets, reservations, advances).
    pub events: Arc<EventBroadcaster>,
    sweeper: Option<SweeperHandle>,
}

impl AllocatorRuntime {
    /// Validates `config`, opens the configured backend and wires everything together.
    ///
    /// Must be called inside a tokio runtime when the sweeper is enabled.
    pub async fn start(config: &AllocatorConfig) -> Result<Self, BootstrapError> {
        config.validate()?;

        let events = EventBroadcaster::new_shared();
        let store = open_store(config, Arc::clone(&events)).await?;
        let allocator = SequenceAllocator::new(store).with_periods(config.sequence_periods()?);

        let sweeper = config.sweeper.enabled.then(|| {
            ResetSweeper::from_config(allocator.clone(), &config.sweeper).start()
        });

        info!(
            backend = allocator.store().backend_name(),
            sequences = config.sequences.len(),
            sweeper = sweeper.is_some(),
            "Sequence allocator ready"
        );

        Ok(Self {
            allocator,
            events,
            sweeper,
        })
    }

    pub fn has_sweeper(&self) -> bool {
        self.sweeper.is_some()
    }

    /// Stops the sweeper, if one is running.
    pub async fn shutdown(self) {
        if let Some(sweeper) = self.sweeper {
            sweeper.shutdown().await;
        }
    }
}

/// Opens the configured backend wrapped so administrative changes are broadcast.
pub async fn open_store(
    config: &AllocatorConfig,
    events: Arc<EventBroadcaster>,
) -> Result<DynCounterStore, BootstrapError> {
    let store: DynCounterStore = match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory counters: numbers are unique within this process only");
            Arc::new(EventedCounterStore::new(InMemoryCounterStore::new(), events))
        }
        StorageBackend::Postgres => {
            let pg = config.storage.postgres.clone().ok_or_else(|| {
                ConfigError::invalid("storage.backend=postgres requires storage.postgres")
            })?;
            let store = PostgresCounterStore::new(pg).await?;
            store.health_check().await?;
            Arc::new(EventedCounterStore::new(store, events))
        }
    };
    Ok(store)
}
