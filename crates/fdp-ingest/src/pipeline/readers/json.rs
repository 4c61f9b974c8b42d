//! JSON reading
//!
//! Accepts either a bare array of record objects or an envelope object
//! holding the array under a known collection key. ISO-formatted strings
//! become timestamps at read time; arrays of objects become nested groups
//! so violation lists survive the trip through field mapping.

use serde_json::Value;
use std::path::Path;

use fdp_common::{FdpError, Result};

use super::{iso_timestamp, source_label, RawGroup, RawRecord, RawValue, ReadOutcome};
use crate::pipeline::mapping::{normalize_name, EntitySchema};
use crate::pipeline::outcome::RecordDescriptor;

pub fn read_json(path: &Path, schema: &EntitySchema) -> Result<ReadOutcome> {
    let input = std::fs::read_to_string(path)?;
    read_json_str(&input, schema, &source_label(path))
}

pub(crate) fn read_json_str(
    input: &str,
    schema: &EntitySchema,
    file: &str,
) -> Result<ReadOutcome> {
    let body: Value = serde_json::from_str(input)?;
    let items = match &body {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => {
            let Some(items) = find_collection(map, schema) else {
                return Err(FdpError::Parse(
                    "JSON object has no recognizable record collection".to_string(),
                ));
            };
            items.as_slice()
        },
        _ => {
            return Err(FdpError::Parse(
                "JSON body is neither an array nor an object".to_string(),
            ));
        },
    };

    let mut outcome = ReadOutcome::default();
    for (index, item) in items.iter().enumerate() {
        let label = format!("{file}:record-{}", index + 1);
        let Value::Object(fields) = item else {
            outcome
                .skipped
                .push(RecordDescriptor::record(label, "array item is not an object"));
            continue;
        };
        let mut record = RawRecord::new(label.clone());
        for (name, value) in fields {
            if let Some(raw) = json_value(value) {
                record.push(schema.resolve(name), raw);
            }
        }
        if record.is_empty() {
            outcome
                .skipped
                .push(RecordDescriptor::record(label, "object has no readable fields"));
        } else {
            outcome.records.push(record);
        }
    }
    Ok(outcome)
}

fn find_collection<'a>(
    map: &'a serde_json::Map<String, Value>,
    schema: &EntitySchema,
) -> Option<&'a Vec<Value>> {
    for key in schema.collection_keys() {
        if let Some(items) = map.get(*key).and_then(Value::as_array) {
            return Some(items);
        }
    }
    // Envelope key casing varies across feeds
    for (name, value) in map {
        if let Value::Array(items) = value {
            let normalized = normalize_name(name);
            if schema.collection_keys().iter().any(|key| normalized == *key) {
                return Some(items);
            }
        }
    }
    None
}

fn json_value(value: &Value) -> Option<RawValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(RawValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(RawValue::Integer(i)),
            None => n.as_f64().map(RawValue::Float),
        },
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| {
                iso_timestamp(trimmed)
                    .map(RawValue::Timestamp)
                    .unwrap_or_else(|| RawValue::Text(trimmed.to_string()))
            })
        },
        Value::Array(items) => {
            let groups: Vec<RawGroup> = items.iter().filter_map(json_group).collect();
            (!groups.is_empty()).then_some(RawValue::Nested(groups))
        },
        Value::Object(_) => json_group(value).map(|group| RawValue::Nested(vec![group])),
    }
}

fn json_group(value: &Value) -> Option<RawGroup> {
    let Value::Object(fields) = value else {
        return None;
    };
    let mut group = RawGroup::default();
    for (name, value) in fields {
        if let Some(raw) = json_value(value) {
            match raw {
                // One level of nesting is all the feeds carry
                RawValue::Nested(_) => {},
                scalar => group.push(normalize_name(name), scalar),
            }
        }
    }
    (!group.is_empty()).then_some(group)
}
