//! Generic ingestion pipeline
//!
//! One pipeline serves every feed. A source contributes an [`Entity`]
//! describing its schema and how raw records become typed rows; the
//! pipeline supplies file reading, field mapping, duplicate filtering,
//! batched persistence, and outcome accounting around it.

pub mod dedup;
pub mod loader;
pub mod mapping;
pub mod normalize;
pub mod outcome;
pub mod readers;
pub mod runner;

pub use dedup::{DuplicateFilter, NaturalKey};
pub use loader::BatchLoader;
pub use mapping::{EntitySchema, FieldSpec};
pub use normalize::{RecordContext, RunContext};
pub use outcome::{OutcomeAggregator, OutcomeSummary, RecordDescriptor};
pub use readers::{RawRecord, RawValue};
pub use runner::{IngestRunner, RunReport};

use fdp_common::types::DataSource;

/// One ingested record type.
///
/// Implementations declare their feed, field schema, and normalization;
/// the pipeline owns everything around that.
pub trait Entity: Clone + std::fmt::Debug + Send + Sync + Sized + 'static {
    /// Feed this entity belongs to
    const KIND: DataSource;

    /// Field schema the readers map incoming names against
    fn schema() -> &'static EntitySchema;

    /// Build the entity from a mapped raw record.
    ///
    /// Returns the entity, or `None` when validation rejects the record,
    /// together with every problem found, so one bad record reports all of
    /// its issues in a single pass rather than only the first.
    fn from_raw(raw: &RawRecord, run: &RunContext) -> (Option<Self>, Vec<RecordDescriptor>);

    /// Key under which duplicates are detected, matching the unique
    /// constraint on the entity's table
    fn natural_key(&self) -> NaturalKey;
}
