//! Postgres persistence for DOT inspections
//!
//! Inserts resolve the inspection's driver by license number against the
//! `drivers` reference table at write time; an unknown or absent license
//! leaves the driver column null rather than failing the row.

use async_trait::async_trait;
use sqlx::{Postgres, Row, Transaction};
use std::collections::HashSet;

use fdp_common::Result;

use super::models::InspectionRecord;
use crate::pipeline::NaturalKey;
use crate::storage::postgres::{PgInsertable, PgStore};
use crate::storage::{db_error, EntityInsert, EntityStore};

#[async_trait]
impl PgInsertable for InspectionRecord {
    async fn insert(&self, tx: &mut Transaction<'_, Postgres>) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO dot_inspections
                 (inspection_id, post_date, driver_name, license_number,
                  tractor_id, tractor_license, trailer_id, trailer_license,
                  violations, driver_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                     (SELECT driver_id FROM drivers WHERE license_number = $4))",
        )
        .bind(self.inspection_id)
        .bind(self.post_date)
        .bind(&self.driver_name)
        .bind(&self.license_number)
        .bind(&self.tractor_id)
        .bind(&self.tractor_license)
        .bind(&self.trailer_id)
        .bind(&self.trailer_license)
        .bind(&self.violations)
        .execute(&mut **tx)
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl EntityStore<InspectionRecord> for PgStore {
    async fn fetch_existing_keys(&self) -> Result<HashSet<NaturalKey>> {
        let rows = sqlx::query("SELECT inspection_id FROM dot_inspections")
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;

        let mut keys = HashSet::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("inspection_id").map_err(db_error)?;
            keys.insert(NaturalKey::single(id.to_string()));
        }
        Ok(keys)
    }

    async fn insert_batch(&self, entities: &[InspectionRecord]) -> Result<Vec<EntityInsert>> {
        self.insert_entities(entities).await
    }
}
