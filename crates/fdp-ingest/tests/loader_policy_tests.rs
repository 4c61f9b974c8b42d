//! Batch loading policy tests
//!
//! Exercises per-record isolation inside a batch and the bounded
//! connectivity retry, end to end through the runner, with the in-memory
//! store injecting the failures.

mod helpers;

use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

use fdp_ingest::maintenance::MaintenanceRecord;
use fdp_ingest::pipeline::{BatchLoader, IngestRunner, NaturalKey, RunContext};
use fdp_ingest::storage::MemoryStore;

fn runner(batch_size: usize, max_retries: u32) -> IngestRunner<MaintenanceRecord> {
    IngestRunner::new(
        RunContext::new(NaiveDate::from_ymd_opt(2024, 1, 18).unwrap()),
        BatchLoader::new(batch_size, max_retries).with_retry_delay(Duration::from_millis(1)),
    )
}

fn three_row_fixture(dir: &TempDir) -> PathBuf {
    helpers::write_fixture(
        dir.path(),
        "pm_schedule.csv",
        &helpers::maintenance_csv(&[
            ("T001", "Oil Change", "2024-01-15"),
            ("T002", "Brake Service", "2024-01-20"),
            ("T003", "Tire Rotation", "2024-02-01"),
        ]),
    )
}

#[tokio::test]
async fn test_constraint_violation_costs_only_that_record() -> Result<()> {
    helpers::init_tracing();
    let dir = tempfile::tempdir()?;
    let file = three_row_fixture(&dir);

    let store = MemoryStore::<MaintenanceRecord>::new();
    store.reject_key(NaturalKey::compound(&["T002", "Brake Service", "2024-01-20"]));

    // One batch holds all three rows; only the rejected one fails
    let report = runner(100, 3).run_file(&store, &file).await?;

    assert_eq!(report.summary.normalized, 3);
    assert_eq!(report.summary.inserted, 2);
    assert_eq!(report.summary.insert_failed, 1);
    assert_eq!(
        report.summary.inserted + report.summary.insert_failed,
        report.summary.normalized
    );
    assert!(!report.summary.is_success());
    assert_eq!(store.len(), 2);

    let failure = report
        .summary
        .problems
        .iter()
        .find(|p| p.reason.contains("unique constraint violation"))
        .unwrap();
    assert_eq!(failure.source, "T002|Brake Service|2024-01-20");
    Ok(())
}

#[tokio::test]
async fn test_connectivity_outage_exhausts_retries_and_fails_remainder() -> Result<()> {
    helpers::init_tracing();
    let dir = tempfile::tempdir()?;
    let file = three_row_fixture(&dir);

    let store = MemoryStore::<MaintenanceRecord>::new();
    store.fail_connectivity(10);

    let report = runner(1, 2).run_file(&store, &file).await?;

    assert_eq!(report.summary.inserted, 0);
    assert_eq!(report.summary.insert_failed, 3);
    assert!(!report.summary.is_success());
    assert!(store.is_empty());

    let aborted = report
        .summary
        .problems
        .iter()
        .filter(|p| {
            p.reason
                .contains("run aborted after storage connectivity failure")
        })
        .count();
    assert_eq!(aborted, 3);
    Ok(())
}

#[tokio::test]
async fn test_transient_outage_recovers_within_retry_budget() -> Result<()> {
    helpers::init_tracing();
    let dir = tempfile::tempdir()?;
    let file = three_row_fixture(&dir);

    let store = MemoryStore::<MaintenanceRecord>::new();
    store.fail_connectivity(1);

    let report = runner(100, 3).run_file(&store, &file).await?;

    assert_eq!(report.summary.inserted, 3);
    assert_eq!(report.summary.insert_failed, 0);
    assert!(report.summary.is_success());
    assert_eq!(store.len(), 3);
    Ok(())
}
