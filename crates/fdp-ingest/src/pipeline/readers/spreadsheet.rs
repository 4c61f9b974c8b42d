//! Spreadsheet and CSV reading
//!
//! The first non-empty row is the header row and is mapped at read time;
//! fully blank rows are skipped wherever they appear, so title padding above
//! the header and trailing blank noise below the data cost nothing. Typed
//! cells (numbers, booleans, datetimes) keep their types for normalization.

use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

use fdp_common::{FdpError, Result};

use super::{source_label, RawRecord, RawValue, ReadOutcome};
use crate::pipeline::mapping::{EntitySchema, ResolvedName};
use crate::pipeline::outcome::RecordDescriptor;

/// Read the first worksheet of an Excel-family workbook
pub fn read_workbook(path: &Path, schema: &EntitySchema) -> Result<ReadOutcome> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| FdpError::Parse(format!("Cannot open workbook: {e}")))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => {
            return Err(FdpError::Parse(format!("Cannot read first worksheet: {e}")));
        },
        None => return Err(FdpError::Parse("Workbook has no worksheets".to_string())),
    };
    Ok(map_rows(range.rows(), schema, &source_label(path)))
}

/// Read a CSV file; cells arrive as text and normalize downstream
pub fn read_csv(path: &Path, schema: &EntitySchema) -> Result<ReadOutcome> {
    let file = std::fs::File::open(path)?;
    read_csv_from(file, schema, &source_label(path))
}

/// Shared row-walking logic for workbook ranges and synthetic row sets
pub(crate) fn map_rows<'a, I>(rows: I, schema: &EntitySchema, file: &str) -> ReadOutcome
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut outcome = ReadOutcome::default();
    let mut headers: Option<Vec<Option<ResolvedName>>> = None;

    for (index, row) in rows.into_iter().enumerate() {
        let row_number = index + 1;
        if row.iter().all(cell_is_blank) {
            continue;
        }
        match &headers {
            None => headers = Some(read_header(row, schema)),
            Some(mapped) => {
                let mut record = RawRecord::new(format!("{file}:{row_number}"));
                for (column, cell) in row.iter().enumerate() {
                    let Some(Some(name)) = mapped.get(column) else {
                        continue;
                    };
                    if let Some(value) = cell_value(cell) {
                        record.push(name.clone(), value);
                    }
                }
                if record.is_empty() {
                    outcome.skipped.push(RecordDescriptor::record(
                        format!("{file}:{row_number}"),
                        "row has no readable cells",
                    ));
                } else {
                    outcome.records.push(record);
                }
            },
        }
    }
    outcome
}

pub(crate) fn read_csv_from<R: std::io::Read>(
    input: R,
    schema: &EntitySchema,
    file: &str,
) -> Result<ReadOutcome> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut outcome = ReadOutcome::default();
    let mut headers: Option<Vec<Option<ResolvedName>>> = None;

    for (index, row) in reader.records().enumerate() {
        let row_number = index + 1;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                outcome.skipped.push(RecordDescriptor::record(
                    format!("{file}:{row_number}"),
                    format!("unreadable CSV row: {e}"),
                ));
                continue;
            },
        };
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        match &headers {
            None => {
                headers = Some(
                    row.iter()
                        .map(|cell| {
                            let trimmed = cell.trim();
                            (!trimmed.is_empty()).then(|| schema.resolve(trimmed))
                        })
                        .collect(),
                );
            },
            Some(mapped) => {
                let mut record = RawRecord::new(format!("{file}:{row_number}"));
                for (column, cell) in row.iter().enumerate() {
                    let Some(Some(name)) = mapped.get(column) else {
                        continue;
                    };
                    let trimmed = cell.trim();
                    if !trimmed.is_empty() {
                        record.push(name.clone(), RawValue::Text(trimmed.to_string()));
                    }
                }
                if record.is_empty() {
                    outcome.skipped.push(RecordDescriptor::record(
                        format!("{file}:{row_number}"),
                        "row has no readable cells",
                    ));
                } else {
                    outcome.records.push(record);
                }
            },
        }
    }
    Ok(outcome)
}

fn read_header(row: &[Data], schema: &EntitySchema) -> Vec<Option<ResolvedName>> {
    row.iter()
        .map(|cell| header_text(cell).map(|text| schema.resolve(&text)))
        .collect()
}

fn header_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        },
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

fn cell_is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_value(cell: &Data) -> Option<RawValue> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| RawValue::Text(trimmed.to_string()))
        },
        Data::Float(f) => Some(RawValue::Float(*f)),
        Data::Int(i) => Some(RawValue::Integer(*i)),
        Data::Bool(b) => Some(RawValue::Bool(*b)),
        Data::DateTime(dt) => dt.as_datetime().map(RawValue::Timestamp),
        Data::DateTimeIso(s) => Some(
            super::iso_timestamp(s)
                .map(RawValue::Timestamp)
                .unwrap_or_else(|| RawValue::Text(s.trim().to_string())),
        ),
        Data::DurationIso(s) => Some(RawValue::Text(s.trim().to_string())),
        Data::Error(_) => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::mapping::FieldSpec;

    fn maintenance_like_schema() -> EntitySchema {
        EntitySchema::new(
            "maintenance_record",
            vec![
                FieldSpec::required("vehicle_id", &["Vehicle ID", "Unit_ID", "Truck_ID"]),
                FieldSpec::required("maintenance_type", &["Maintenance Type", "Service_Type"]),
                FieldSpec::required("due_date", &["Due Date", "Service_Due", "Scheduled_Date"]),
                FieldSpec::optional("mileage", &["Mileage"]),
            ],
        )
    }

    fn text(value: &str) -> Data {
        Data::String(value.to_string())
    }

    #[test]
    fn test_first_nonempty_row_is_header() {
        let schema = maintenance_like_schema();
        let rows: Vec<Vec<Data>> = vec![
            vec![Data::Empty, Data::Empty, Data::Empty],
            vec![text(""), text("  "), Data::Empty],
            vec![text("Unit_ID"), text("Service_Type"), text("Scheduled_Date")],
            vec![text("T-12"), text("Oil Change"), text("2025-04-01")],
        ];

        let outcome = map_rows(rows.iter().map(Vec::as_slice), &schema, "pm.xlsx");
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.source(), "pm.xlsx:4");
        assert_eq!(record.get("vehicle_id"), Some(&RawValue::Text("T-12".into())));
        assert_eq!(
            record.get("maintenance_type"),
            Some(&RawValue::Text("Oil Change".into()))
        );
        assert_eq!(
            record.get("due_date"),
            Some(&RawValue::Text("2025-04-01".into()))
        );
    }

    #[test]
    fn test_blank_rows_between_and_after_data_are_skipped() {
        let schema = maintenance_like_schema();
        let rows: Vec<Vec<Data>> = vec![
            vec![text("Vehicle ID"), text("Maintenance Type"), text("Due Date")],
            vec![text("T-1"), text("Brakes"), text("2025-05-01")],
            vec![Data::Empty, Data::Empty, Data::Empty],
            vec![text("T-2"), text("Tires"), text("2025-05-02")],
            vec![Data::Empty, Data::Empty, Data::Empty],
            vec![Data::Empty, Data::Empty, Data::Empty],
        ];

        let outcome = map_rows(rows.iter().map(Vec::as_slice), &schema, "pm.xlsx");
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_typed_cells_are_preserved() {
        let schema = maintenance_like_schema();
        let rows: Vec<Vec<Data>> = vec![
            vec![text("Unit_ID"), text("Service_Type"), text("Scheduled_Date"), text("Mileage")],
            vec![
                Data::Int(8812),
                text("Inspection"),
                Data::DateTimeIso("2025-04-01T00:00:00".to_string()),
                Data::Float(120534.5),
            ],
        ];

        let outcome = map_rows(rows.iter().map(Vec::as_slice), &schema, "pm.xlsx");
        let record = &outcome.records[0];
        assert_eq!(record.get("vehicle_id"), Some(&RawValue::Integer(8812)));
        assert_eq!(record.get("mileage"), Some(&RawValue::Float(120534.5)));
        assert!(matches!(record.get("due_date"), Some(RawValue::Timestamp(_))));
    }

    #[test]
    fn test_unmapped_header_values_become_metadata() {
        let schema = maintenance_like_schema();
        let rows: Vec<Vec<Data>> = vec![
            vec![text("Unit_ID"), text("Service_Type"), text("Scheduled_Date"), text("Shop Notes")],
            vec![text("T-9"), text("Alignment"), text("2025-04-10"), text("left drift")],
        ];

        let outcome = map_rows(rows.iter().map(Vec::as_slice), &schema, "pm.xlsx");
        let record = &outcome.records[0];
        assert_eq!(record.metadata().len(), 1);
        assert_eq!(record.metadata()[0].0, "shopnotes");
        assert_eq!(record.metadata()[0].1, RawValue::Text("left drift".into()));
    }

    #[test]
    fn test_row_of_error_cells_is_skipped_with_descriptor() {
        let schema = maintenance_like_schema();
        let rows: Vec<Vec<Data>> = vec![
            vec![text("Unit_ID"), text("Service_Type"), text("Scheduled_Date")],
            vec![
                Data::Error(calamine::CellErrorType::NA),
                Data::Error(calamine::CellErrorType::NA),
                Data::Error(calamine::CellErrorType::NA),
            ],
        ];

        let outcome = map_rows(rows.iter().map(Vec::as_slice), &schema, "pm.xlsx");
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.skipped[0].reason.contains("no readable cells"));
    }

    #[test]
    fn test_csv_maps_aliased_headers() {
        let schema = maintenance_like_schema();
        let input = "\
Unit_ID,Service_Type,Scheduled_Date
T-12,Oil Change,2025-04-01
T-13,Brakes,2025-04-02
";
        let outcome = read_csv_from(input.as_bytes(), &schema, "pm.csv").unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(
            outcome.records[0].get("vehicle_id"),
            Some(&RawValue::Text("T-12".into()))
        );
        assert_eq!(outcome.records[1].source(), "pm.csv:3");
    }

    #[test]
    fn test_csv_blank_rows_and_short_rows() {
        let schema = maintenance_like_schema();
        let input = "\

Vehicle ID,Maintenance Type,Due Date,Mileage
,,,
T-1,Brakes,2025-05-01,88000
T-2,Tires
";
        let outcome = read_csv_from(input.as_bytes(), &schema, "pm.csv").unwrap();
        assert_eq!(outcome.records.len(), 2);
        let short = &outcome.records[1];
        assert_eq!(short.get("vehicle_id"), Some(&RawValue::Text("T-2".into())));
        assert_eq!(short.get("due_date"), None);
    }
}
