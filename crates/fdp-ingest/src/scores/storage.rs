//! Postgres persistence for driver scores

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Postgres, Row, Transaction};
use std::collections::HashSet;

use fdp_common::Result;

use super::models::{score_key, ScoreRecord};
use crate::pipeline::NaturalKey;
use crate::storage::postgres::{PgInsertable, PgStore};
use crate::storage::{db_error, EntityInsert, EntityStore};

#[async_trait]
impl PgInsertable for ScoreRecord {
    async fn insert(&self, tx: &mut Transaction<'_, Postgres>) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO driver_scores (driver_id, minutes_analyzed, driver_score, reported_month)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&self.driver_id)
        .bind(self.minutes_analyzed)
        .bind(self.driver_score)
        .bind(self.reported_month)
        .execute(&mut **tx)
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl EntityStore<ScoreRecord> for PgStore {
    async fn fetch_existing_keys(&self) -> Result<HashSet<NaturalKey>> {
        let rows = sqlx::query("SELECT driver_id, reported_month FROM driver_scores")
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;

        let mut keys = HashSet::with_capacity(rows.len());
        for row in &rows {
            let driver_id: String = row.try_get("driver_id").map_err(db_error)?;
            let month: NaiveDate = row.try_get("reported_month").map_err(db_error)?;
            keys.insert(score_key(&driver_id, month));
        }
        Ok(keys)
    }

    async fn insert_batch(&self, entities: &[ScoreRecord]) -> Result<Vec<EntityInsert>> {
        self.insert_entities(entities).await
    }
}
