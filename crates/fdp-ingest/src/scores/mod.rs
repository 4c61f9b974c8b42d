//! Driver safety-score ingestion
//!
//! Monthly safety-score exports arrive as CSV or Excel workbooks, one row
//! per driver. Each row carries the driver, the minutes of driving the
//! score was computed over, and the score itself; the reporting month is
//! often missing and defaults to the month before the run date.

pub mod analysis;
pub mod models;
pub mod storage;

// Re-export commonly used types
pub use analysis::{analyze, ScoreAnalysis};
pub use models::ScoreRecord;
