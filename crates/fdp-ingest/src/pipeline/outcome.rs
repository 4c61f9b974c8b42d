//! Run outcome accounting
//!
//! Every input record ends in exactly one terminal state: inserted,
//! duplicate-skipped, validation-failed, or insert-failed. The aggregator is
//! the run's single writer; finalizing it produces the immutable summary the
//! caller receives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fdp_common::types::DataSource;

/// One reported problem, tied to where in the input it arose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDescriptor {
    /// Position label, "scores_2025_02.csv:14" or "inspections.xml:record-3";
    /// insert failures carry the entity's natural key instead
    pub source: String,
    /// Field the problem concerns, when it is field-scoped
    pub field: Option<String>,
    pub reason: String,
}

impl RecordDescriptor {
    pub fn record(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            field: None,
            reason: reason.into(),
        }
    }

    pub fn field(
        source: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            field: Some(field.into()),
            reason: reason.into(),
        }
    }
}

/// Immutable summary of one completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub source: DataSource,
    /// Raw records seen, including rows that failed at read level
    pub total_records: usize,
    /// Records that became typed entities (duplicates included)
    pub normalized: usize,
    pub validation_failed: usize,
    pub duplicates_skipped: usize,
    pub inserted: usize,
    pub insert_failed: usize,
    /// Whole files that could not be read at all
    pub file_errors: usize,
    pub problems: Vec<RecordDescriptor>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl OutcomeSummary {
    /// A run succeeds when every file was readable and nothing failed at
    /// insert time; validation rejections and duplicates are expected noise.
    pub fn is_success(&self) -> bool {
        self.file_errors == 0 && self.insert_failed == 0
    }

    /// Share of records that were persisted or already present
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            100.0
        } else {
            (self.inserted + self.duplicates_skipped) as f64 / self.total_records as f64 * 100.0
        }
    }

    pub fn duration_secs(&self) -> i64 {
        (self.completed_at - self.started_at).num_seconds()
    }

    /// One-line result for the status tracker
    pub fn status_comment(&self) -> String {
        format!(
            "{} inserted, {} duplicates, {} rejected, {} failed",
            self.inserted, self.duplicates_skipped, self.validation_failed, self.insert_failed
        )
    }

    /// Combine per-file summaries from one directory run
    pub fn merge_all(source: DataSource, summaries: &[OutcomeSummary]) -> OutcomeSummary {
        let now = Utc::now();
        let mut merged = OutcomeSummary {
            source,
            total_records: 0,
            normalized: 0,
            validation_failed: 0,
            duplicates_skipped: 0,
            inserted: 0,
            insert_failed: 0,
            file_errors: 0,
            problems: Vec::new(),
            started_at: summaries.iter().map(|s| s.started_at).min().unwrap_or(now),
            completed_at: summaries
                .iter()
                .map(|s| s.completed_at)
                .max()
                .unwrap_or(now),
        };
        for summary in summaries {
            merged.total_records += summary.total_records;
            merged.normalized += summary.normalized;
            merged.validation_failed += summary.validation_failed;
            merged.duplicates_skipped += summary.duplicates_skipped;
            merged.inserted += summary.inserted;
            merged.insert_failed += summary.insert_failed;
            merged.file_errors += summary.file_errors;
            merged.problems.extend(summary.problems.iter().cloned());
        }
        merged
    }
}

/// Accumulates dispositions while a run is in flight
#[derive(Debug)]
pub struct OutcomeAggregator {
    source: DataSource,
    started_at: DateTime<Utc>,
    total_records: usize,
    normalized: usize,
    validation_failed: usize,
    duplicates_skipped: usize,
    inserted: usize,
    insert_failed: usize,
    file_errors: usize,
    problems: Vec<RecordDescriptor>,
}

impl OutcomeAggregator {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            started_at: Utc::now(),
            total_records: 0,
            normalized: 0,
            validation_failed: 0,
            duplicates_skipped: 0,
            inserted: 0,
            insert_failed: 0,
            file_errors: 0,
            problems: Vec::new(),
        }
    }

    /// A whole file could not be read; contributes no records
    pub fn record_file_error(&mut self, descriptor: RecordDescriptor) {
        self.file_errors += 1;
        self.problems.push(descriptor);
    }

    /// A row was skipped at read level; counts as seen and rejected
    pub fn record_read_failure(&mut self, descriptor: RecordDescriptor) {
        self.total_records += 1;
        self.validation_failed += 1;
        self.problems.push(descriptor);
    }

    /// Normalization rejected the record; `problems` names every offense
    pub fn record_rejected(&mut self, problems: Vec<RecordDescriptor>) {
        self.total_records += 1;
        self.validation_failed += 1;
        self.problems.extend(problems);
    }

    /// The record became a typed entity
    pub fn record_normalized(&mut self, flags: Vec<RecordDescriptor>) {
        self.total_records += 1;
        self.normalized += 1;
        self.problems.extend(flags);
    }

    pub fn record_duplicate(&mut self) {
        self.duplicates_skipped += 1;
    }

    pub fn record_inserted(&mut self) {
        self.inserted += 1;
    }

    pub fn record_insert_failure(&mut self, descriptor: RecordDescriptor) {
        self.insert_failed += 1;
        self.problems.push(descriptor);
    }

    pub fn finalize(self) -> OutcomeSummary {
        OutcomeSummary {
            source: self.source,
            total_records: self.total_records,
            normalized: self.normalized,
            validation_failed: self.validation_failed,
            duplicates_skipped: self.duplicates_skipped,
            inserted: self.inserted,
            insert_failed: self.insert_failed,
            file_errors: self.file_errors,
            problems: self.problems,
            started_at: self.started_at,
            completed_at: Utc::now(),
        }
    }
}
