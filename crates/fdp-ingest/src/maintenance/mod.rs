//! Programmed-maintenance ingestion
//!
//! Maintenance schedules arrive as fleet-system workbook or CSV exports,
//! one row per vehicle and service type. Rows carry a due date plus
//! free-form status and priority columns that shops fill inconsistently,
//! so both are parsed leniently and unknown values pass through verbatim.

pub mod analysis;
pub mod models;
pub mod storage;

// Re-export commonly used types
pub use analysis::{analyze, MaintenanceAnalysis};
pub use models::{MaintenanceRecord, MaintenanceStatus, Priority};
