//! Driver safety-score data model

use chrono::{Datelike, NaiveDate};
use std::sync::OnceLock;

use fdp_common::types::DataSource;

use crate::pipeline::{
    Entity, EntitySchema, FieldSpec, NaturalKey, RawRecord, RecordContext, RecordDescriptor,
    RunContext,
};

/// One driver's safety score for one reporting month
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub driver_id: String,
    /// Minutes of driving the score was computed over
    pub minutes_analyzed: i32,
    pub driver_score: i32,
    /// First day of the month the score reports on
    pub reported_month: NaiveDate,
}

static SCHEMA: OnceLock<EntitySchema> = OnceLock::new();

pub(crate) fn score_key(driver_id: &str, reported_month: NaiveDate) -> NaturalKey {
    NaturalKey::compound(&[driver_id, &reported_month.to_string()])
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

impl Entity for ScoreRecord {
    const KIND: DataSource = DataSource::DriverScores;

    fn schema() -> &'static EntitySchema {
        SCHEMA.get_or_init(|| {
            EntitySchema::new(
                "driver_score",
                vec![
                    FieldSpec::required("driver_id", &["Driver ID", "DriverID", "ID"]),
                    FieldSpec::optional(
                        "minutes_analyzed",
                        &["Minutes Analyzed", "MinutesAnalyzed", "Minutes"],
                    ),
                    FieldSpec::required("driver_score", &["Driver Score", "DriverScore", "Score"]),
                    FieldSpec::optional(
                        "reported_month",
                        &["Reported Month", "report_month", "Period", "Month"],
                    ),
                ],
            )
        })
    }

    fn from_raw(raw: &RawRecord, run: &RunContext) -> (Option<Self>, Vec<RecordDescriptor>) {
        let mut ctx = RecordContext::new(raw);

        let driver_id = ctx.require_text("driver_id");
        let driver_score = ctx.require_i32("driver_score");
        let minutes_analyzed = ctx.optional_i32("minutes_analyzed").unwrap_or(0);
        // Scores are month-granular; day components in the feed are noise
        let reported_month = ctx
            .optional_date("reported_month")
            .map(first_of_month)
            .unwrap_or_else(|| run.previous_month());

        let entity = match (driver_id, driver_score) {
            (Some(driver_id), Some(driver_score)) => Some(Self {
                driver_id,
                minutes_analyzed,
                driver_score,
                reported_month,
            }),
            _ => None,
        };
        (entity, ctx.into_problems())
    }

    fn natural_key(&self) -> NaturalKey {
        score_key(&self.driver_id, self.reported_month)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::RawValue;

    fn run_context() -> RunContext {
        RunContext::new(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap())
    }

    fn raw(driver: &str, score: &str) -> RawRecord {
        let mut raw = RawRecord::new("scores.csv:2");
        raw.insert_field("driver_id", RawValue::Text(driver.to_string()));
        raw.insert_field("driver_score", RawValue::Text(score.to_string()));
        raw
    }

    #[test]
    fn test_normalizes_with_defaults() {
        let (entity, problems) = ScoreRecord::from_raw(&raw("D100", "92"), &run_context());
        let record = entity.unwrap();
        assert_eq!(record.driver_id, "D100");
        assert_eq!(record.driver_score, 92);
        assert_eq!(record.minutes_analyzed, 0);
        // Defaults to the first day of the month before the run date
        assert_eq!(
            record.reported_month,
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
        );
        assert!(problems.is_empty());
    }

    #[test]
    fn test_fractional_score_truncates() {
        let (entity, _) = ScoreRecord::from_raw(&raw("D100", "95.5"), &run_context());
        assert_eq!(entity.unwrap().driver_score, 95);
    }

    #[test]
    fn test_nan_driver_id_rejects() {
        let (entity, problems) = ScoreRecord::from_raw(&raw("nan", "88"), &run_context());
        assert!(entity.is_none());
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].field.as_deref(), Some("driver_id"));
    }

    #[test]
    fn test_missing_required_fields_all_named() {
        let raw = RawRecord::new("scores.csv:3");
        let (entity, problems) = ScoreRecord::from_raw(&raw, &run_context());
        assert!(entity.is_none());
        let fields: Vec<_> = problems.iter().filter_map(|p| p.field.as_deref()).collect();
        assert_eq!(fields, vec!["driver_id", "driver_score"]);
    }

    #[test]
    fn test_reported_month_snaps_to_month_start() {
        let mut input = raw("D7", "70");
        input.insert_field(
            "reported_month",
            RawValue::Text("2025-01-28".to_string()),
        );
        let (entity, _) = ScoreRecord::from_raw(&input, &run_context());
        assert_eq!(
            entity.unwrap().reported_month,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_natural_key_spans_driver_and_month() {
        let (entity, _) = ScoreRecord::from_raw(&raw("D100", "92"), &run_context());
        let key = entity.unwrap().natural_key();
        assert_eq!(key.to_string(), "D100|2025-02-01");
    }
}
