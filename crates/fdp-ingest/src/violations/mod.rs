//! Hours-of-service violation ingestion
//!
//! HOS violation reports arrive as spreadsheet exports or JSON dumps, one
//! row per violation. Feeds disagree on identifiers: some carry a stable
//! violation id, others only the driver and start time, from which an id is
//! generated so reruns stay duplicate-safe.

pub mod analysis;
pub mod models;
pub mod storage;

// Re-export commonly used types
pub use analysis::{analyze, ViolationAnalysis};
pub use models::ViolationRecord;
