//! Format readers
//!
//! Each reader turns one input file into uniform raw records whose keys are
//! already resolved against the entity schema. A malformed row becomes a
//! skip descriptor and reading continues; only a file that cannot be read at
//! all errors out, and then with zero records.

pub mod json;
pub mod spreadsheet;
pub mod xml;

use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;

use fdp_common::types::SourceFormat;
use fdp_common::{FdpError, Result};

use crate::pipeline::mapping::{EntitySchema, ResolvedName};
use crate::pipeline::outcome::RecordDescriptor;

/// One cell/leaf value as a reader saw it, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    /// Repeated sub-structures (one flattened group per instance), as an
    /// XML record's vehicle or violation lists arrive
    Nested(Vec<RawGroup>),
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Text(s) => f.write_str(s),
            RawValue::Integer(i) => write!(f, "{i}"),
            RawValue::Float(v) => write!(f, "{v}"),
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Date(d) => write!(f, "{d}"),
            RawValue::Timestamp(t) => write!(f, "{t}"),
            RawValue::Nested(groups) => write!(f, "[{} nested]", groups.len()),
        }
    }
}

/// A flattened sub-record; keys are normalized leaf names
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawGroup {
    fields: Vec<(String, RawValue)>,
}

impl RawGroup {
    pub fn push(&mut self, key: String, value: RawValue) {
        self.fields.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The value under `key` when it is plain text
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(RawValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One input record with schema-resolved keys; unmapped names are retained
/// as metadata under their normalized form
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    source: String,
    fields: Vec<(&'static str, RawValue)>,
    metadata: Vec<(String, RawValue)>,
}

impl RawRecord {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            fields: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Position label for descriptors ("file.csv:12", "feed.xml:record-3")
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Route a resolved name to the canonical fields or the metadata bag
    pub fn push(&mut self, name: ResolvedName, value: RawValue) {
        match name {
            ResolvedName::Canonical(canonical) => self.insert_field(canonical, value),
            ResolvedName::Unmapped(key) => {
                if !key.is_empty() {
                    self.metadata.push((key, value));
                }
            },
        }
    }

    pub fn insert_field(&mut self, canonical: &'static str, value: RawValue) {
        self.fields.push((canonical, value));
    }

    /// First value under a canonical name; when two source columns map to
    /// the same field the earlier one wins
    pub fn get(&self, canonical: &str) -> Option<&RawValue> {
        self.fields
            .iter()
            .find(|(k, _)| *k == canonical)
            .map(|(_, v)| v)
    }

    /// The nested groups under a canonical name, if that is what it holds
    pub fn nested(&self, canonical: &str) -> Option<&[RawGroup]> {
        match self.get(canonical) {
            Some(RawValue::Nested(groups)) => Some(groups.as_slice()),
            _ => None,
        }
    }

    pub fn metadata(&self) -> &[(String, RawValue)] {
        &self.metadata
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.metadata.is_empty()
    }
}

/// Everything read from one file
#[derive(Debug, Default)]
pub struct ReadOutcome {
    pub records: Vec<RawRecord>,
    /// Rows/records skipped at read level, with why
    pub skipped: Vec<RecordDescriptor>,
}

/// Read one file, dispatching on its extension
pub fn read_file(path: &Path, schema: &EntitySchema) -> Result<ReadOutcome> {
    let format = SourceFormat::from_path(path)
        .ok_or_else(|| FdpError::UnsupportedFormat(path.display().to_string()))?;
    match format {
        SourceFormat::Csv => spreadsheet::read_csv(path, schema),
        SourceFormat::Spreadsheet => spreadsheet::read_workbook(path, schema),
        SourceFormat::Xml => xml::read_xml(path, schema),
        SourceFormat::Json => json::read_json(path, schema),
    }
}

/// File name alone; descriptors stay readable without the full path
pub(crate) fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Recognize an ISO-8601 timestamp literal, the form JSON feeds embed
pub(crate) fn iso_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    chrono::DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.naive_utc())
}
