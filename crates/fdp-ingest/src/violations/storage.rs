//! Postgres persistence for HOS violations

use async_trait::async_trait;
use sqlx::{Postgres, Row, Transaction};
use std::collections::HashSet;

use fdp_common::Result;

use super::models::ViolationRecord;
use crate::pipeline::NaturalKey;
use crate::storage::postgres::{PgInsertable, PgStore};
use crate::storage::{db_error, EntityInsert, EntityStore};

#[async_trait]
impl PgInsertable for ViolationRecord {
    async fn insert(&self, tx: &mut Transaction<'_, Postgres>) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO hos_violations
                 (violation_id, start_time_and_driver, driver_id, driver_name,
                  violation_start_time, violation_end_time, driver_status,
                  terminal, ruleset, violation_type, violation_duration)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&self.violation_id)
        .bind(&self.start_time_and_driver)
        .bind(&self.driver_id)
        .bind(&self.driver_name)
        .bind(self.violation_start_time)
        .bind(self.violation_end_time)
        .bind(&self.driver_status)
        .bind(&self.terminal)
        .bind(&self.ruleset)
        .bind(&self.violation_type)
        .bind(&self.violation_duration)
        .execute(&mut **tx)
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl EntityStore<ViolationRecord> for PgStore {
    async fn fetch_existing_keys(&self) -> Result<HashSet<NaturalKey>> {
        let rows = sqlx::query("SELECT violation_id FROM hos_violations")
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;

        let mut keys = HashSet::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("violation_id").map_err(db_error)?;
            keys.insert(NaturalKey::single(id));
        }
        Ok(keys)
    }

    async fn insert_batch(&self, entities: &[ViolationRecord]) -> Result<Vec<EntityInsert>> {
        self.insert_entities(entities).await
    }
}
