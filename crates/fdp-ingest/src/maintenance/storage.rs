//! Postgres persistence for maintenance records

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Postgres, Row, Transaction};
use std::collections::HashSet;

use fdp_common::Result;

use super::models::{maintenance_key, MaintenanceRecord};
use crate::pipeline::NaturalKey;
use crate::storage::postgres::{PgInsertable, PgStore};
use crate::storage::{db_error, EntityInsert, EntityStore};

#[async_trait]
impl PgInsertable for MaintenanceRecord {
    async fn insert(&self, tx: &mut Transaction<'_, Postgres>) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO maintenance_records
                 (vehicle_id, vehicle_number, maintenance_type, due_date,
                  last_service, mileage, service_miles, status, priority,
                  location, process_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&self.vehicle_id)
        .bind(&self.vehicle_number)
        .bind(&self.maintenance_type)
        .bind(self.due_date)
        .bind(self.last_service)
        .bind(self.mileage)
        .bind(self.service_miles)
        .bind(self.status.as_ref().map(ToString::to_string))
        .bind(self.priority.as_ref().map(ToString::to_string))
        .bind(&self.location)
        .bind(self.process_date)
        .execute(&mut **tx)
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl EntityStore<MaintenanceRecord> for PgStore {
    async fn fetch_existing_keys(&self) -> Result<HashSet<NaturalKey>> {
        let rows = sqlx::query(
            "SELECT vehicle_id, maintenance_type, due_date FROM maintenance_records",
        )
        .fetch_all(self.pool())
        .await
        .map_err(db_error)?;

        let mut keys = HashSet::with_capacity(rows.len());
        for row in &rows {
            let vehicle_id: String = row.try_get("vehicle_id").map_err(db_error)?;
            let maintenance_type: String = row.try_get("maintenance_type").map_err(db_error)?;
            let due_date: NaiveDate = row.try_get("due_date").map_err(db_error)?;
            keys.insert(maintenance_key(&vehicle_id, &maintenance_type, due_date));
        }
        Ok(keys)
    }

    async fn insert_batch(&self, entities: &[MaintenanceRecord]) -> Result<Vec<EntityInsert>> {
        self.insert_entities(entities).await
    }
}
