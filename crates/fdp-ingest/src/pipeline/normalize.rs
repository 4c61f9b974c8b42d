//! Record normalization
//!
//! Turns schema-resolved raw records into typed entities. Problems are
//! collected rather than thrown so a record reports everything wrong with it
//! at once: a missing or uncoercible required field rejects the record, an
//! uncoercible optional field becomes null with a field-level descriptor,
//! and the record is still emitted.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::pipeline::outcome::RecordDescriptor;
use crate::pipeline::readers::{RawRecord, RawValue};

/// Values a run injects into normalization rather than reading from input
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    pub run_date: NaiveDate,
}

impl RunContext {
    pub fn new(run_date: NaiveDate) -> Self {
        Self { run_date }
    }

    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    /// First day of the month before the run date. Monthly exports that omit
    /// their reporting period default to it.
    pub fn previous_month(&self) -> NaiveDate {
        let first_of_month = self.run_date.with_day(1).unwrap_or(self.run_date);
        let end_of_previous = first_of_month.pred_opt().unwrap_or(first_of_month);
        end_of_previous.with_day(1).unwrap_or(end_of_previous)
    }
}

/// Collects coercion outcomes for one record while an entity is being built.
///
/// Callers evaluate every field accessor before deciding whether the record
/// survives, so the descriptor list names all problems, not just the first.
pub struct RecordContext<'a> {
    raw: &'a RawRecord,
    problems: Vec<RecordDescriptor>,
}

impl<'a> RecordContext<'a> {
    pub fn new(raw: &'a RawRecord) -> Self {
        Self {
            raw,
            problems: Vec::new(),
        }
    }

    pub fn source(&self) -> &str {
        self.raw.source()
    }

    /// Attach a field-scoped descriptor without affecting the record's fate
    pub fn flag(&mut self, field: &'static str, reason: impl Into<String>) {
        self.problems
            .push(RecordDescriptor::field(self.raw.source(), field, reason));
    }

    pub fn into_problems(self) -> Vec<RecordDescriptor> {
        self.problems
    }

    pub fn require_text(&mut self, field: &'static str) -> Option<String> {
        self.required(field, "text", coerce_text)
    }

    pub fn optional_text(&mut self, field: &'static str) -> Option<String> {
        self.optional(field, "text", coerce_text)
    }

    pub fn require_i64(&mut self, field: &'static str) -> Option<i64> {
        self.required(field, "integer", coerce_i64)
    }

    pub fn require_i32(&mut self, field: &'static str) -> Option<i32> {
        self.required(field, "integer", coerce_i32)
    }

    pub fn optional_i32(&mut self, field: &'static str) -> Option<i32> {
        self.optional(field, "integer", coerce_i32)
    }

    pub fn optional_f64(&mut self, field: &'static str) -> Option<f64> {
        self.optional(field, "number", coerce_f64)
    }

    pub fn require_date(&mut self, field: &'static str) -> Option<NaiveDate> {
        self.required(field, "date", coerce_date)
    }

    pub fn optional_date(&mut self, field: &'static str) -> Option<NaiveDate> {
        self.optional(field, "date", coerce_date)
    }

    pub fn require_timestamp(&mut self, field: &'static str) -> Option<NaiveDateTime> {
        self.required(field, "timestamp", coerce_timestamp)
    }

    pub fn optional_timestamp(&mut self, field: &'static str) -> Option<NaiveDateTime> {
        self.optional(field, "timestamp", coerce_timestamp)
    }

    fn required<T>(
        &mut self,
        field: &'static str,
        kind: &str,
        coerce: impl Fn(&RawValue) -> Option<T>,
    ) -> Option<T> {
        match self.raw.get(field) {
            None => {
                self.problems.push(RecordDescriptor::field(
                    self.raw.source(),
                    field,
                    "missing required field",
                ));
                None
            },
            Some(value) => {
                let coerced = coerce(value);
                if coerced.is_none() {
                    self.problems.push(RecordDescriptor::field(
                        self.raw.source(),
                        field,
                        format!("cannot read {kind} from \"{value}\""),
                    ));
                }
                coerced
            },
        }
    }

    fn optional<T>(
        &mut self,
        field: &'static str,
        kind: &str,
        coerce: impl Fn(&RawValue) -> Option<T>,
    ) -> Option<T> {
        let value = self.raw.get(field)?;
        let coerced = coerce(value);
        if coerced.is_none() {
            self.problems.push(RecordDescriptor::field(
                self.raw.source(),
                field,
                format!("cannot read {kind} from \"{value}\"; field left empty"),
            ));
        }
        coerced
    }
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a date literal; the first matching format wins.
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    parse_timestamp(text).map(|ts| ts.date())
}

/// Parse a timestamp literal; bare dates are taken as midnight and
/// offset-carrying forms are normalized to UTC.
pub(crate) fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(ts.naive_utc());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn strip_separators(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, ',' | ' ')).collect()
}

fn coerce_text(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
                None
            } else {
                Some(trimmed.to_string())
            }
        },
        RawValue::Integer(i) => Some(i.to_string()),
        RawValue::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            Some(format!("{}", *f as i64))
        },
        RawValue::Float(f) => Some(f.to_string()),
        RawValue::Bool(b) => Some(b.to_string()),
        RawValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        RawValue::Timestamp(t) => Some(t.format("%Y-%m-%d %H:%M:%S").to_string()),
        RawValue::Nested(_) => None,
    }
}

fn coerce_i64(value: &RawValue) -> Option<i64> {
    match value {
        RawValue::Integer(i) => Some(*i),
        RawValue::Float(f) => float_to_i64(*f),
        RawValue::Text(s) => {
            let cleaned = strip_separators(s);
            cleaned
                .parse::<i64>()
                .ok()
                .or_else(|| cleaned.parse::<f64>().ok().and_then(float_to_i64))
        },
        _ => None,
    }
}

fn coerce_i32(value: &RawValue) -> Option<i32> {
    coerce_i64(value).and_then(|n| i32::try_from(n).ok())
}

fn coerce_f64(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Integer(i) => Some(*i as f64),
        RawValue::Float(f) => Some(*f),
        RawValue::Text(s) => strip_separators(s).parse::<f64>().ok(),
        _ => None,
    }
}

fn coerce_date(value: &RawValue) -> Option<NaiveDate> {
    match value {
        RawValue::Date(d) => Some(*d),
        RawValue::Timestamp(t) => Some(t.date()),
        RawValue::Text(s) => parse_date(s),
        _ => None,
    }
}

fn coerce_timestamp(value: &RawValue) -> Option<NaiveDateTime> {
    match value {
        RawValue::Timestamp(t) => Some(*t),
        RawValue::Date(d) => d.and_hms_opt(0, 0, 0),
        RawValue::Text(s) => parse_timestamp(s),
        _ => None,
    }
}

// Fractional parts truncate, matching how the feeds have always been read.
fn float_to_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
