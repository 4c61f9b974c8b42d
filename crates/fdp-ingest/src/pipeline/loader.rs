//! Batched persistence
//!
//! Entities that clear the duplicate filter are written in batches, each
//! batch one transaction. A constraint failure inside a batch costs only
//! that entity. When the store itself cannot be reached the batch retries
//! with linear backoff; once retries are exhausted every remaining entity
//! in the run is marked failed rather than silently dropped.

use std::time::Duration;
use tracing::{debug, error, warn};

use fdp_common::Result;

use crate::pipeline::outcome::{OutcomeAggregator, RecordDescriptor};
use crate::pipeline::Entity;
use crate::storage::{EntityInsert, EntityStore};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct BatchLoader {
    batch_size: usize,
    max_retries: u32,
    retry_delay: Duration,
}

impl Default for BatchLoader {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES)
    }
}

impl BatchLoader {
    pub fn new(batch_size: usize, max_retries: u32) -> Self {
        Self {
            batch_size: batch_size.max(1),
            max_retries,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Backoff unit between retries; tests shrink it
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Write `entities` through `store`, recording each disposition.
    ///
    /// After a connectivity failure survives all retries, the remaining
    /// entities are recorded as insert failures under the aborting error
    /// so the run's accounting stays complete.
    pub async fn load<E, S>(&self, store: &S, entities: Vec<E>, outcome: &mut OutcomeAggregator)
    where
        E: Entity,
        S: EntityStore<E> + ?Sized,
    {
        if entities.is_empty() {
            return;
        }
        debug!(
            entity = E::schema().entity(),
            count = entities.len(),
            batch_size = self.batch_size,
            "Loading entities"
        );

        let mut fatal: Option<String> = None;
        for batch in entities.chunks(self.batch_size) {
            if let Some(reason) = &fatal {
                for entity in batch {
                    outcome.record_insert_failure(RecordDescriptor::record(
                        entity.natural_key().to_string(),
                        reason.clone(),
                    ));
                }
                continue;
            }

            match self.insert_with_retry(store, batch).await {
                Ok(results) => {
                    for (i, entity) in batch.iter().enumerate() {
                        match results.get(i) {
                            Some(EntityInsert::Inserted) => outcome.record_inserted(),
                            Some(EntityInsert::Failed(reason)) => {
                                outcome.record_insert_failure(RecordDescriptor::record(
                                    entity.natural_key().to_string(),
                                    reason.clone(),
                                ));
                            },
                            None => {
                                outcome.record_insert_failure(RecordDescriptor::record(
                                    entity.natural_key().to_string(),
                                    "store reported no result for this entity",
                                ));
                            },
                        }
                    }
                },
                Err(e) => {
                    let reason = format!("run aborted after storage connectivity failure: {e}");
                    error!(
                        entity = E::schema().entity(),
                        error = %e,
                        "Batch insert failed after retries; failing remaining entities"
                    );
                    for entity in batch {
                        outcome.record_insert_failure(RecordDescriptor::record(
                            entity.natural_key().to_string(),
                            reason.clone(),
                        ));
                    }
                    fatal = Some(reason);
                },
            }
        }
    }

    async fn insert_with_retry<E, S>(&self, store: &S, batch: &[E]) -> Result<Vec<EntityInsert>>
    where
        E: Entity,
        S: EntityStore<E> + ?Sized,
    {
        let mut attempt = 0u32;
        loop {
            match store.insert_batch(batch).await {
                Ok(results) => return Ok(results),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.retry_delay * attempt;
                    warn!(
                        error = %e,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Batch insert failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                },
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::{
        EntitySchema, FieldSpec, NaturalKey, RawRecord, RecordContext, RunContext,
    };
    use crate::storage::MemoryStore;
    use fdp_common::types::DataSource;
    use std::sync::OnceLock;

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: u32,
    }

    static SCHEMA: OnceLock<EntitySchema> = OnceLock::new();

    impl Entity for Widget {
        const KIND: DataSource = DataSource::Maintenance;

        fn schema() -> &'static EntitySchema {
            SCHEMA.get_or_init(|| EntitySchema::new("widget", vec![FieldSpec::required("id", &[])]))
        }

        fn from_raw(
            raw: &RawRecord,
            _run: &RunContext,
        ) -> (Option<Self>, Vec<RecordDescriptor>) {
            let mut ctx = RecordContext::new(raw);
            let id = ctx.require_i64("id");
            (id.map(|id| Self { id: id as u32 }), ctx.into_problems())
        }

        fn natural_key(&self) -> NaturalKey {
            NaturalKey::single(self.id.to_string())
        }
    }

    fn widgets(n: u32) -> Vec<Widget> {
        (1..=n).map(|id| Widget { id }).collect()
    }

    fn aggregator_for(n: usize) -> OutcomeAggregator {
        let mut outcome = OutcomeAggregator::new(DataSource::Maintenance);
        for _ in 0..n {
            outcome.record_normalized(vec![]);
        }
        outcome
    }

    #[tokio::test]
    async fn test_loads_across_batches() {
        let store = MemoryStore::new();
        let loader = BatchLoader::new(3, 0);
        let mut outcome = aggregator_for(7);

        loader.load(&store, widgets(7), &mut outcome).await;

        assert_eq!(store.len(), 7);
        let summary = outcome.finalize();
        assert_eq!(summary.inserted, 7);
        assert_eq!(summary.insert_failed, 0);
        assert!(summary.is_success());
    }

    #[tokio::test]
    async fn test_constraint_failure_costs_one_entity() {
        let store = MemoryStore::new();
        store.reject_key(NaturalKey::single("2"));
        let loader = BatchLoader::new(10, 0);
        let mut outcome = aggregator_for(3);

        loader.load(&store, widgets(3), &mut outcome).await;

        assert_eq!(store.len(), 2);
        let summary = outcome.finalize();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.insert_failed, 1);
        assert_eq!(summary.problems.len(), 1);
        assert_eq!(summary.problems[0].source, "2");
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_outage() {
        let store = MemoryStore::new();
        store.fail_connectivity(2);
        let loader = BatchLoader::new(10, 3).with_retry_delay(Duration::from_millis(1));
        let mut outcome = aggregator_for(4);

        loader.load(&store, widgets(4), &mut outcome).await;

        assert_eq!(store.len(), 4);
        assert_eq!(outcome.finalize().inserted, 4);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_the_remainder() {
        let store = MemoryStore::new();
        store.fail_connectivity(10);
        let loader = BatchLoader::new(2, 1).with_retry_delay(Duration::from_millis(1));
        let mut outcome = aggregator_for(5);

        loader.load(&store, widgets(5), &mut outcome).await;

        assert_eq!(store.len(), 0);
        let summary = outcome.finalize();
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.insert_failed, 5);
        assert!(summary
            .problems
            .iter()
            .all(|p| p.reason.contains("run aborted")));
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn test_empty_load_is_a_no_op() {
        let store: MemoryStore<Widget> = MemoryStore::new();
        let loader = BatchLoader::default();
        let mut outcome = aggregator_for(0);

        loader.load(&store, Vec::new(), &mut outcome).await;

        assert!(store.is_empty());
        assert_eq!(outcome.finalize().inserted, 0);
    }
}
