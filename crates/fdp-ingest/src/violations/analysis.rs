//! HOS violation run analysis

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use super::models::ViolationRecord;

/// Read-only projection over the violations of one run
#[derive(Debug, Clone, Serialize)]
pub struct ViolationAnalysis {
    pub records: usize,
    pub by_driver: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    /// Violations without a terminal are counted in `records` but not here
    pub by_terminal: BTreeMap<String, usize>,
    pub first_start: Option<NaiveDateTime>,
    pub last_start: Option<NaiveDateTime>,
}

pub fn analyze(records: &[ViolationRecord]) -> ViolationAnalysis {
    let mut by_driver = BTreeMap::new();
    let mut by_type = BTreeMap::new();
    let mut by_terminal = BTreeMap::new();

    for record in records {
        *by_driver.entry(record.driver_id.clone()).or_insert(0) += 1;
        *by_type.entry(record.violation_type.clone()).or_insert(0) += 1;
        if let Some(terminal) = &record.terminal {
            *by_terminal.entry(terminal.clone()).or_insert(0) += 1;
        }
    }

    ViolationAnalysis {
        records: records.len(),
        by_driver,
        by_type,
        by_terminal,
        first_start: records.iter().map(|r| r.violation_start_time).min(),
        last_start: records.iter().map(|r| r.violation_start_time).max(),
    }
}
