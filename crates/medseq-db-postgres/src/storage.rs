//! PostgreSQL implementation of the CounterStore trait.

use async_trait::async_trait;
use medseq_core::{CounterRecord, ResetPeriod, SequenceName};
use medseq_storage::{AdvanceOutcome, CounterStore, Increment, IssuedNumber, StorageError};
use sqlx_postgres::PgPool;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::config::PostgresConfig;
use crate::migrations;
use crate::pool;
use crate::queries::{counter, ledger};

/// PostgreSQL counter backend.
///
/// All processes pointing at the same database share counter state, which is
/// what makes allocation globally unique under horizontal scaling.
#[derive(Debug, Clone)]
pub struct PostgresCounterStore {
    pool: PgPool,
}

impl PostgresCounterStore {
    /// Creates a new `PostgresCounterStore` with the given configuration.
    ///
    /// This will:
    /// 1. Create a connection pool
    /// 2. Run migrations (if configured)
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Creates a new `PostgresCounterStore` from an existing connection pool.
    ///
    /// Migrations are not run automatically when using this constructor.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Checks that the database answers.
    pub async fn health_check(&self) -> Result<(), StorageError> {
        pool::ping(&self.pool).await.map_err(StorageError::from)
    }
}

#[async_trait]
impl CounterStore for PostgresCounterStore {
    #[instrument(skip(self), fields(sequence = %name))]
    async fn atomic_increment(
        &self,
        name: &SequenceName,
        period_on_create: ResetPeriod,
    ) -> Result<Increment, StorageError> {
        let issued = counter::increment(&self.pool, name, period_on_create).await?;
        debug!(value = issued.value(), reissued = issued.reissued, "Counter incremented");
        Ok(issued)
    }

    #[instrument(skip(self), fields(sequence = %name))]
    async fn compare_and_advance(
        &self,
        name: &SequenceName,
        candidate: u64,
        period_on_create: ResetPeriod,
    ) -> Result<AdvanceOutcome, StorageError> {
        let outcome = counter::advance_to(&self.pool, name, candidate, period_on_create).await?;
        debug!(
            advanced = outcome.advanced(),
            value = outcome.record().value,
            "Compare-and-advance applied"
        );
        Ok(outcome)
    }

    async fn get(&self, name: &SequenceName) -> Result<Option<CounterRecord>, StorageError> {
        counter::get(&self.pool, name).await
    }

    #[instrument(skip(self), fields(sequence = %name))]
    async fn set(
        &self,
        name: &SequenceName,
        value: u64,
        reset_period: Option<ResetPeriod>,
        period_on_create: ResetPeriod,
    ) -> Result<CounterRecord, StorageError> {
        counter::overwrite(&self.pool, name, value, reset_period, period_on_create).await
    }

    #[instrument(skip(self), fields(sequence = %name))]
    async fn reset_if_stale(
        &self,
        name: &SequenceName,
        period_start: OffsetDateTime,
        value: u64,
    ) -> Result<Option<CounterRecord>, StorageError> {
        counter::reset_if_stale(&self.pool, name, period_start, value).await
    }

    async fn list(&self) -> Result<Vec<CounterRecord>, StorageError> {
        counter::list(&self.pool).await
    }

    async fn is_issued(&self, name: &SequenceName, value: u64) -> Result<bool, StorageError> {
        ledger::contains(&self.pool, name, value).await
    }

    #[instrument(skip(self), fields(sequence = %name))]
    async fn claim_and_advance(
        &self,
        name: &SequenceName,
        value: u64,
        period_on_create: ResetPeriod,
    ) -> Result<Option<AdvanceOutcome>, StorageError> {
        let outcome = ledger::claim_and_advance(&self.pool, name, value, period_on_create).await?;
        debug!(
            claimed = outcome.is_some(),
            advanced = outcome.as_ref().is_some_and(AdvanceOutcome::advanced),
            "Claim-and-advance applied"
        );
        Ok(outcome)
    }

    async fn issued_numbers(&self, name: &SequenceName) -> Result<Vec<IssuedNumber>, StorageError> {
        ledger::list(&self.pool, name).await
    }

    fn is_shared(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
