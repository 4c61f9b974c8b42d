//! In-memory store backing dry runs and tests
//!
//! Behaves like the Postgres backend from the pipeline's point of view:
//! duplicate natural keys fail individually, and tests can inject
//! constraint failures or connectivity outages.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use fdp_common::types::DataSource;
use fdp_common::{FdpError, Result};

use super::{EntityInsert, EntityStore, StatusTracker};
use crate::pipeline::{Entity, NaturalKey};

#[derive(Debug)]
pub struct MemoryStore<E> {
    inner: Mutex<Inner<E>>,
}

#[derive(Debug)]
struct Inner<E> {
    rows: Vec<E>,
    keys: HashSet<NaturalKey>,
    rejected_keys: HashSet<NaturalKey>,
    connectivity_failures: u32,
    statuses: Vec<(String, bool, String)>,
}

impl<E> Default for MemoryStore<E> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                rows: Vec::new(),
                keys: HashSet::new(),
                rejected_keys: HashSet::new(),
                connectivity_failures: 0,
                statuses: Vec::new(),
            }),
        }
    }
}

impl<E> MemoryStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<E>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Pretend `key` was persisted by an earlier run
    pub fn seed_key(&self, key: NaturalKey) {
        self.lock().keys.insert(key);
    }

    /// Make inserts of `key` fail the way a constraint violation would
    pub fn reject_key(&self, key: NaturalKey) {
        self.lock().rejected_keys.insert(key);
    }

    /// Fail the next `n` batch calls as if the store were unreachable
    pub fn fail_connectivity(&self, n: u32) {
        self.lock().connectivity_failures = n;
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().rows.is_empty()
    }

    /// Reported run statuses as (source slug, success, comments)
    pub fn statuses(&self) -> Vec<(String, bool, String)> {
        self.lock().statuses.clone()
    }
}

impl<E: Clone> MemoryStore<E> {
    pub fn rows(&self) -> Vec<E> {
        self.lock().rows.clone()
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for MemoryStore<E> {
    async fn fetch_existing_keys(&self) -> Result<HashSet<NaturalKey>> {
        Ok(self.lock().keys.clone())
    }

    async fn insert_batch(&self, entities: &[E]) -> Result<Vec<EntityInsert>> {
        let mut inner = self.lock();
        if inner.connectivity_failures > 0 {
            inner.connectivity_failures -= 1;
            return Err(FdpError::Database("connection refused".to_string()));
        }

        let mut results = Vec::with_capacity(entities.len());
        for entity in entities {
            let key = entity.natural_key();
            if inner.rejected_keys.contains(&key) {
                results.push(EntityInsert::Failed(
                    "unique constraint violation".to_string(),
                ));
                continue;
            }
            if !inner.keys.insert(key) {
                results.push(EntityInsert::Failed("duplicate natural key".to_string()));
                continue;
            }
            inner.rows.push(entity.clone());
            results.push(EntityInsert::Inserted);
        }
        Ok(results)
    }
}

#[async_trait]
impl<E: Entity> StatusTracker for MemoryStore<E> {
    async fn report_run(&self, source: DataSource, success: bool, comments: &str) -> Result<()> {
        self.lock()
            .statuses
            .push((source.as_str().to_string(), success, comments.to_string()));
        Ok(())
    }
}
