//! Postgres storage backend
//!
//! One pool serves every source. A batch runs as a single transaction with
//! a savepoint around each entity, so a constraint violation rolls back
//! that entity alone while the rest of the batch commits. Errors that mean
//! the database itself is unreachable surface as `Err` from the batch and
//! feed the loader's retry path.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::info;

use fdp_common::types::DataSource;
use fdp_common::{FdpError, Result};

use super::{db_error, EntityInsert, StatusTracker};
use crate::config::DatabaseConfig;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| FdpError::Database(format!("Cannot connect to database: {e}")))?;

        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Database connection pool created"
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| FdpError::Database(format!("Migration failed: {e}")))?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| FdpError::Database(e.to_string()))
    }

    /// Write one batch as a transaction of savepoint-isolated inserts
    pub(crate) async fn insert_entities<E>(&self, entities: &[E]) -> Result<Vec<EntityInsert>>
    where
        E: PgInsertable + Sync,
    {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let mut results = Vec::with_capacity(entities.len());

        for (index, entity) in entities.iter().enumerate() {
            let savepoint = format!("entity_{index}");
            sqlx::query(&format!("SAVEPOINT {savepoint}"))
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;

            match entity.insert(&mut tx).await {
                Ok(()) => {
                    sqlx::query(&format!("RELEASE SAVEPOINT {savepoint}"))
                        .execute(&mut *tx)
                        .await
                        .map_err(db_error)?;
                    results.push(EntityInsert::Inserted);
                },
                Err(e) if is_connectivity(&e) => return Err(db_error(e)),
                Err(e) => {
                    sqlx::query(&format!("ROLLBACK TO SAVEPOINT {savepoint}"))
                        .execute(&mut *tx)
                        .await
                        .map_err(db_error)?;
                    results.push(EntityInsert::Failed(failure_reason(&e)));
                },
            }
        }

        tx.commit().await.map_err(db_error)?;
        Ok(results)
    }
}

/// One entity's INSERT, executed inside the batch transaction
#[async_trait]
pub(crate) trait PgInsertable {
    async fn insert(&self, tx: &mut Transaction<'_, Postgres>) -> sqlx::Result<()>;
}

/// Errors meaning the database is unreachable rather than the row unwritable
fn is_connectivity(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

fn failure_reason(e: &sqlx::Error) -> String {
    match e.as_database_error() {
        Some(db) => db.message().to_string(),
        None => e.to_string(),
    }
}

#[async_trait]
impl StatusTracker for PgStore {
    async fn report_run(&self, source: DataSource, success: bool, comments: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO ingest_status (source, result, comments, last_execution)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (source)
             DO UPDATE SET result = EXCLUDED.result,
                           comments = EXCLUDED.comments,
                           last_execution = EXCLUDED.last_execution",
        )
        .bind(source.as_str())
        .bind(success)
        .bind(comments)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}
