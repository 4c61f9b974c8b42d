//! DOT roadside inspection ingestion
//!
//! Inspection feeds arrive as XML: an `<Inspections>` document wrapping one
//! `<Inspection>` element per roadside stop. Each record nests a header
//! section, at most one driver, the tractor/trailer pair, and zero or more
//! violations. Normalization flattens all of that into one row per
//! inspection, with the violation list rendered as a single text column.

pub mod analysis;
pub mod models;
pub mod storage;

// Re-export commonly used types
pub use analysis::{analyze, InspectionAnalysis};
pub use models::InspectionRecord;
