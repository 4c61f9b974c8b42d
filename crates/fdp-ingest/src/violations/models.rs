//! HOS violation data model

use chrono::NaiveDateTime;
use std::sync::OnceLock;

use fdp_common::types::DataSource;

use crate::pipeline::{
    Entity, EntitySchema, FieldSpec, NaturalKey, RawRecord, RecordContext, RecordDescriptor,
    RunContext,
};

const TIME_STAMP: &str = "%Y-%m-%d %H:%M:%S";

/// One hours-of-service violation
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationRecord {
    /// Feed-provided id, or "{driver_id}_{start time}" when the feed has none
    pub violation_id: String,
    pub start_time_and_driver: Option<String>,
    pub driver_id: String,
    pub driver_name: Option<String>,
    pub violation_start_time: NaiveDateTime,
    pub violation_end_time: Option<NaiveDateTime>,
    pub driver_status: Option<String>,
    pub terminal: Option<String>,
    pub ruleset: Option<String>,
    pub violation_type: String,
    pub violation_duration: Option<String>,
}

static SCHEMA: OnceLock<EntitySchema> = OnceLock::new();

impl Entity for ViolationRecord {
    const KIND: DataSource = DataSource::HosViolations;

    fn schema() -> &'static EntitySchema {
        SCHEMA.get_or_init(|| {
            EntitySchema::new(
                "hos_violation",
                vec![
                    FieldSpec::optional("violation_id", &["ID"]),
                    FieldSpec::required("driver_id", &["Driver ID", "DriverID", "Employee_ID"]),
                    FieldSpec::optional(
                        "driver_name",
                        &["Driver Name", "DriverName", "Name", "Employee_Name"],
                    ),
                    FieldSpec::required(
                        "violation_start_time",
                        &["Violation Start Time", "Violation Date", "ViolationDate", "Date"],
                    ),
                    FieldSpec::optional("violation_end_time", &["Violation End Time"]),
                    FieldSpec::required(
                        "violation_type",
                        &["Violation Type", "ViolationType", "Type"],
                    ),
                    FieldSpec::optional(
                        "violation_duration",
                        &["Violation Duration (HH:MM:SS)", "Description", "Desc", "Details"],
                    ),
                    FieldSpec::optional("driver_status", &["Driver Status", "Status"]),
                    FieldSpec::optional("terminal", &["Terminal", "Location", "Base"]),
                    FieldSpec::optional("ruleset", &["Ruleset", "Rules", "Rule_Set"]),
                    FieldSpec::optional("start_time_and_driver", &["Start Time and Driver"]),
                ],
            )
            .with_collection_keys(&["violations"])
        })
    }

    fn from_raw(raw: &RawRecord, _run: &RunContext) -> (Option<Self>, Vec<RecordDescriptor>) {
        let mut ctx = RecordContext::new(raw);

        let driver_id = ctx.require_text("driver_id");
        let violation_start_time = ctx.require_timestamp("violation_start_time");
        let violation_type = ctx.require_text("violation_type");
        let driver_name = ctx.optional_text("driver_name");
        let violation_end_time = ctx.optional_timestamp("violation_end_time");
        let driver_status = ctx.optional_text("driver_status");
        let terminal = ctx.optional_text("terminal");
        let ruleset = ctx.optional_text("ruleset");
        let violation_duration = ctx.optional_text("violation_duration");
        let violation_id = ctx.optional_text("violation_id");
        let start_time_and_driver = ctx.optional_text("start_time_and_driver");

        let entity = match (driver_id, violation_start_time, violation_type) {
            (Some(driver_id), Some(start), Some(violation_type)) => {
                let stamp = start.format(TIME_STAMP).to_string();
                let violation_id =
                    violation_id.unwrap_or_else(|| format!("{driver_id}_{stamp}"));
                let start_time_and_driver = start_time_and_driver.or_else(|| {
                    Some(format!(
                        "{stamp} - {}",
                        driver_name.as_deref().unwrap_or(&driver_id)
                    ))
                });
                Some(Self {
                    violation_id,
                    start_time_and_driver,
                    driver_id,
                    driver_name,
                    violation_start_time: start,
                    violation_end_time,
                    driver_status,
                    terminal,
                    ruleset,
                    violation_type,
                    violation_duration,
                })
            },
            _ => None,
        };
        (entity, ctx.into_problems())
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::single(self.violation_id.clone())
    }
}
