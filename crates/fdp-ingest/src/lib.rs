//! # FDP Ingest
//!
//! Flexible-schema ingestion of fleet event feeds into the platform store.
//!
//! # Supported Data Sources
//!
//! - **Driver scores**: monthly safety-score exports (CSV, Excel)
//! - **DOT inspections**: roadside inspection feeds (XML)
//! - **HOS violations**: hours-of-service violation reports (spreadsheet, JSON)
//! - **Maintenance**: programmed maintenance schedules (Excel, CSV)
//!
//! Every source runs through the same pipeline: a format reader produces raw
//! records, a per-entity schema maps source field names to canonical ones,
//! normalization coerces and validates, a duplicate filter drops keys already
//! stored or already seen this run, and batches are loaded with per-record
//! isolation. The run hands back a [`pipeline::RunReport`] with full
//! accounting.
//!
//! # Example
//!
//! ```no_run
//! use fdp_ingest::maintenance::MaintenanceRecord;
//! use fdp_ingest::pipeline::{BatchLoader, IngestRunner, RunContext};
//! use fdp_ingest::storage::MemoryStore;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::<MaintenanceRecord>::new();
//!     let runner = IngestRunner::new(RunContext::today(), BatchLoader::default());
//!     let report = runner
//!         .run_file(&store, Path::new("./data/maintenance/pm_schedule.xlsx"))
//!         .await?;
//!     println!("{}", report.summary.status_comment());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod inspections;
pub mod maintenance;
pub mod pipeline;
pub mod scores;
pub mod storage;
pub mod violations;
