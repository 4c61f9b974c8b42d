//! Inspection run analysis

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

use super::models::InspectionRecord;

/// Read-only projection over the inspections of one run
#[derive(Debug, Clone, Serialize)]
pub struct InspectionAnalysis {
    pub records: usize,
    pub with_violations: usize,
    pub without_violations: usize,
    /// Distinct license numbers seen; driver-less inspections do not count
    pub unique_drivers: usize,
    pub first_post_date: Option<NaiveDate>,
    pub last_post_date: Option<NaiveDate>,
}

pub fn analyze(records: &[InspectionRecord]) -> InspectionAnalysis {
    let with_violations = records.iter().filter(|r| r.violations.is_some()).count();
    let drivers: HashSet<&str> = records
        .iter()
        .filter_map(|r| r.license_number.as_deref())
        .collect();

    InspectionAnalysis {
        records: records.len(),
        with_violations,
        without_violations: records.len() - with_violations,
        unique_drivers: drivers.len(),
        first_post_date: records.iter().map(|r| r.post_date).min(),
        last_post_date: records.iter().map(|r| r.post_date).max(),
    }
}
