//! Run orchestration
//!
//! A run covers one file or one directory of files for a single source.
//! The duplicate filter is seeded from storage once per run and shared
//! across every file, so a key repeated in two files of the same drop is
//! still caught. One unreadable file fails itself, not the run.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use fdp_common::types::SourceFormat;
use fdp_common::Result;

use crate::pipeline::dedup::DuplicateFilter;
use crate::pipeline::loader::BatchLoader;
use crate::pipeline::normalize::RunContext;
use crate::pipeline::outcome::{OutcomeAggregator, OutcomeSummary, RecordDescriptor};
use crate::pipeline::{readers, Entity};
use crate::storage::EntityStore;

/// Everything a completed run hands back: the accounting summaries plus the
/// normalized entities, which the analysis step reads
#[derive(Debug)]
pub struct RunReport<E> {
    /// All files of the run combined
    pub summary: OutcomeSummary,
    /// One summary per input file, in processing order
    pub per_file: Vec<OutcomeSummary>,
    pub entities: Vec<E>,
}

#[derive(Debug)]
pub struct IngestRunner<E> {
    run: RunContext,
    loader: BatchLoader,
    _entity: PhantomData<E>,
}

impl<E: Entity> IngestRunner<E> {
    pub fn new(run: RunContext, loader: BatchLoader) -> Self {
        Self {
            run,
            loader,
            _entity: PhantomData,
        }
    }

    /// Ingest one file
    pub async fn run_file<S>(&self, store: &S, path: &Path) -> Result<RunReport<E>>
    where
        S: EntityStore<E> + ?Sized,
    {
        let paths = [path.to_path_buf()];
        self.run_paths(store, &paths).await
    }

    /// Ingest every supported file under `dir`, in lexical order
    pub async fn run_directory<S>(&self, store: &S, dir: &Path) -> Result<RunReport<E>>
    where
        S: EntityStore<E> + ?Sized,
    {
        let files = discover_files(dir)?;
        if files.is_empty() {
            warn!(
                source = %E::KIND,
                dir = %dir.display(),
                "No supported files found in directory"
            );
        }
        self.run_paths(store, &files).await
    }

    async fn run_paths<S>(&self, store: &S, paths: &[PathBuf]) -> Result<RunReport<E>>
    where
        S: EntityStore<E> + ?Sized,
    {
        let run_id = Uuid::new_v4();
        info!(
            source = %E::KIND,
            %run_id,
            files = paths.len(),
            run_date = %self.run.run_date,
            "Starting ingest run"
        );

        let existing = store.fetch_existing_keys().await?;
        let mut filter = DuplicateFilter::new(existing);
        info!(
            source = %E::KIND,
            %run_id,
            known_keys = filter.preloaded(),
            "Seeded duplicate filter from storage"
        );

        let mut per_file = Vec::with_capacity(paths.len());
        let mut entities = Vec::new();
        for path in paths {
            let mut outcome = OutcomeAggregator::new(E::KIND);
            self.process_file(store, path, &mut filter, &mut outcome, &mut entities)
                .await;
            per_file.push(outcome.finalize());
        }

        let summary = OutcomeSummary::merge_all(E::KIND, &per_file);
        info!(
            source = %E::KIND,
            %run_id,
            total = summary.total_records,
            inserted = summary.inserted,
            duplicates = summary.duplicates_skipped,
            rejected = summary.validation_failed,
            insert_failed = summary.insert_failed,
            file_errors = summary.file_errors,
            "Ingest run finished"
        );
        Ok(RunReport {
            summary,
            per_file,
            entities,
        })
    }

    async fn process_file<S>(
        &self,
        store: &S,
        path: &Path,
        filter: &mut DuplicateFilter,
        outcome: &mut OutcomeAggregator,
        collected: &mut Vec<E>,
    ) where
        S: EntityStore<E> + ?Sized,
    {
        let read = match readers::read_file(path, E::schema()) {
            Ok(read) => read,
            Err(e) => {
                warn!(
                    source = %E::KIND,
                    path = %path.display(),
                    error = %e,
                    "File could not be read"
                );
                outcome.record_file_error(RecordDescriptor::record(
                    path.display().to_string(),
                    e.to_string(),
                ));
                return;
            },
        };
        info!(
            source = %E::KIND,
            path = %path.display(),
            records = read.records.len(),
            skipped = read.skipped.len(),
            "Read file"
        );
        for descriptor in read.skipped {
            outcome.record_read_failure(descriptor);
        }

        let mut fresh = Vec::new();
        for raw in &read.records {
            let (entity, problems) = E::from_raw(raw, &self.run);
            match entity {
                Some(entity) => {
                    outcome.record_normalized(problems);
                    let key = entity.natural_key();
                    collected.push(entity.clone());
                    if filter.admit(&key) {
                        fresh.push(entity);
                    } else {
                        outcome.record_duplicate();
                    }
                },
                None => outcome.record_rejected(problems),
            }
        }

        self.loader.load(store, fresh, outcome).await;
    }
}

fn discover_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && SourceFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    // Feeds name files with sortable date stamps, so lexical order is
    // chronological order
    files.sort();
    Ok(files)
}
