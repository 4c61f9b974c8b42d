//! Maintenance data model

use chrono::NaiveDate;
use std::fmt;
use std::sync::OnceLock;

use fdp_common::types::DataSource;

use crate::pipeline::mapping::normalize_name;
use crate::pipeline::{
    Entity, EntitySchema, FieldSpec, NaturalKey, RawRecord, RecordContext, RecordDescriptor,
    RunContext,
};

/// Lifecycle of a scheduled service. Source systems spell these every way
/// ("In Progress", "IN-PROGRESS", "InProgress"); matching ignores case and
/// separators, and anything unrecognized is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceStatus {
    Scheduled,
    Due,
    Overdue,
    InProgress,
    Completed,
    Other(String),
}

impl MaintenanceStatus {
    pub fn parse(text: &str) -> Self {
        match normalize_name(text).as_str() {
            "scheduled" => Self::Scheduled,
            "due" => Self::Due,
            "overdue" => Self::Overdue,
            "inprogress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::Other(text.to_string()),
        }
    }
}

impl fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Due => write!(f, "due"),
            Self::Overdue => write!(f, "overdue"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Other(text) => write!(f, "{text}"),
        }
    }
}

/// Service priority, same lenient parse as [`MaintenanceStatus`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Other(String),
}

impl Priority {
    pub fn parse(text: &str) -> Self {
        match normalize_name(text).as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Other(text.to_string()),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
            Self::Other(text) => write!(f, "{text}"),
        }
    }
}

/// One scheduled service for one vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceRecord {
    pub vehicle_id: String,
    pub vehicle_number: Option<String>,
    pub maintenance_type: String,
    pub due_date: NaiveDate,
    pub last_service: Option<NaiveDate>,
    pub mileage: Option<f64>,
    pub service_miles: Option<f64>,
    pub status: Option<MaintenanceStatus>,
    pub priority: Option<Priority>,
    pub location: Option<String>,
    /// Run date, injected by the pipeline rather than read from input
    pub process_date: NaiveDate,
}

pub(crate) fn maintenance_key(
    vehicle_id: &str,
    maintenance_type: &str,
    due_date: NaiveDate,
) -> NaturalKey {
    NaturalKey::compound(&[vehicle_id, maintenance_type, &due_date.to_string()])
}

static SCHEMA: OnceLock<EntitySchema> = OnceLock::new();

impl Entity for MaintenanceRecord {
    const KIND: DataSource = DataSource::Maintenance;

    fn schema() -> &'static EntitySchema {
        SCHEMA.get_or_init(|| {
            EntitySchema::new(
                "maintenance",
                vec![
                    FieldSpec::required("vehicle_id", &["Vehicle ID", "Unit_ID", "Truck_ID"]),
                    FieldSpec::optional("vehicle_number", &["Vehicle Number"]),
                    FieldSpec::required(
                        "maintenance_type",
                        &["Maintenance Type", "Service_Type", "Work_Type"],
                    ),
                    FieldSpec::required(
                        "due_date",
                        &["Due Date", "Service_Due", "Scheduled_Date"],
                    ),
                    FieldSpec::optional("last_service", &["Last Service"]),
                    FieldSpec::optional("mileage", &[]),
                    FieldSpec::optional("service_miles", &["Service Miles", "Miles_To_Service"]),
                    FieldSpec::optional("status", &[]),
                    FieldSpec::optional("priority", &[]),
                    FieldSpec::optional("location", &[]),
                ],
            )
        })
    }

    fn from_raw(raw: &RawRecord, run: &RunContext) -> (Option<Self>, Vec<RecordDescriptor>) {
        let mut ctx = RecordContext::new(raw);

        let vehicle_id = ctx.require_text("vehicle_id");
        let maintenance_type = ctx.require_text("maintenance_type");
        let due_date = ctx.require_date("due_date");
        let vehicle_number = ctx.optional_text("vehicle_number");
        let last_service = ctx.optional_date("last_service");
        let mileage = ctx.optional_f64("mileage");
        let service_miles = ctx.optional_f64("service_miles");
        let status = ctx.optional_text("status").map(|s| MaintenanceStatus::parse(&s));
        let priority = ctx.optional_text("priority").map(|p| Priority::parse(&p));
        let location = ctx.optional_text("location");

        let entity = match (vehicle_id, maintenance_type, due_date) {
            (Some(vehicle_id), Some(maintenance_type), Some(due_date)) => Some(Self {
                vehicle_id,
                vehicle_number,
                maintenance_type,
                due_date,
                last_service,
                mileage,
                service_miles,
                status,
                priority,
                location,
                process_date: run.run_date,
            }),
            _ => None,
        };
        (entity, ctx.into_problems())
    }

    fn natural_key(&self) -> NaturalKey {
        maintenance_key(&self.vehicle_id, &self.maintenance_type, self.due_date)
    }
}
