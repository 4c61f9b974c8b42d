//! Storage backends
//!
//! The pipeline talks to storage through two traits: [`EntityStore`] for
//! reading existing keys and writing batches, [`StatusTracker`] for the
//! per-source run ledger operators watch. Postgres is the real backend;
//! [`memory::MemoryStore`] backs dry runs and tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use std::collections::HashSet;

use fdp_common::types::DataSource;
use fdp_common::{FdpError, Result};

use crate::pipeline::{Entity, NaturalKey};

pub(crate) fn db_error(e: sqlx::Error) -> FdpError {
    FdpError::Database(e.to_string())
}

/// Outcome for one entity within a batch insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityInsert {
    Inserted,
    /// The entity could not be written; the rest of the batch is unaffected
    Failed(String),
}

/// Storage backend for one entity type
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    /// Natural keys already persisted, used to seed the duplicate filter
    async fn fetch_existing_keys(&self) -> Result<HashSet<NaturalKey>>;

    /// Write one batch inside a single transaction.
    ///
    /// Returns one [`EntityInsert`] per entity, in order. Per-entity
    /// constraint failures land in the result vec; `Err` is reserved for
    /// the batch as a whole being unattemptable (the store is unreachable).
    async fn insert_batch(&self, entities: &[E]) -> Result<Vec<EntityInsert>>;
}

/// Per-source run ledger
#[async_trait]
pub trait StatusTracker: Send + Sync {
    async fn report_run(&self, source: DataSource, success: bool, comments: &str) -> Result<()>;
}
