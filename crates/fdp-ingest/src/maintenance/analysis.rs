//! Maintenance run analysis

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::models::{MaintenanceRecord, MaintenanceStatus};

/// Read-only projection over the maintenance records of one run
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceAnalysis {
    pub records: usize,
    /// Due strictly before `as_of`, or explicitly marked overdue
    pub overdue: usize,
    pub overdue_pct: f64,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

pub fn analyze(records: &[MaintenanceRecord], as_of: NaiveDate) -> MaintenanceAnalysis {
    let mut overdue = 0;
    let mut by_status = BTreeMap::new();
    let mut by_priority = BTreeMap::new();
    let mut by_type = BTreeMap::new();

    for record in records {
        if record.due_date < as_of || record.status == Some(MaintenanceStatus::Overdue) {
            overdue += 1;
        }
        if let Some(status) = &record.status {
            *by_status.entry(status.to_string()).or_insert(0) += 1;
        }
        if let Some(priority) = &record.priority {
            *by_priority.entry(priority.to_string()).or_insert(0) += 1;
        }
        *by_type.entry(record.maintenance_type.clone()).or_insert(0) += 1;
    }

    let overdue_pct = if records.is_empty() {
        0.0
    } else {
        overdue as f64 * 100.0 / records.len() as f64
    };

    MaintenanceAnalysis {
        records: records.len(),
        overdue,
        overdue_pct,
        by_status,
        by_priority,
        by_type,
    }
}
