//! DOT inspection data model

use chrono::NaiveDate;
use std::sync::OnceLock;

use fdp_common::types::DataSource;

use crate::pipeline::readers::RawGroup;
use crate::pipeline::{
    Entity, EntitySchema, FieldSpec, NaturalKey, RawRecord, RecordContext, RecordDescriptor,
    RunContext,
};

/// One roadside inspection, flattened from the feed's nested XML
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionRecord {
    pub inspection_id: i64,
    pub post_date: NaiveDate,
    pub driver_name: Option<String>,
    pub license_number: Option<String>,
    pub tractor_id: Option<String>,
    pub tractor_license: Option<String>,
    pub trailer_id: Option<String>,
    pub trailer_license: Option<String>,
    /// Every violation rendered "code category description", instances
    /// joined by " | ", double quotes stripped
    pub violations: Option<String>,
}

static SCHEMA: OnceLock<EntitySchema> = OnceLock::new();

impl Entity for InspectionRecord {
    const KIND: DataSource = DataSource::DotInspections;

    fn schema() -> &'static EntitySchema {
        SCHEMA.get_or_init(|| {
            EntitySchema::new(
                "dot_inspection",
                vec![
                    FieldSpec::required("inspection_id", &["inspectionId", "Inspection ID"]),
                    FieldSpec::required(
                        "post_date",
                        &["InspectionPostDate", "Post Date", "Inspection Date"],
                    ),
                    FieldSpec::optional("drivers", &[]),
                    FieldSpec::optional("vehicles", &[]),
                    FieldSpec::optional("violations", &[]),
                ],
            )
        })
    }

    fn from_raw(raw: &RawRecord, _run: &RunContext) -> (Option<Self>, Vec<RecordDescriptor>) {
        let mut ctx = RecordContext::new(raw);

        let inspection_id = ctx.require_i64("inspection_id");
        let post_date = ctx.require_date("post_date");

        let driver = raw.nested("drivers").and_then(<[RawGroup]>::first);
        let driver_name = driver
            .and_then(|g| g.text("driverlastname"))
            .map(str::to_string);
        let license_number = driver
            .and_then(|g| g.text("driverlicenseid"))
            .map(str::to_string);
        if driver_name.is_none() && license_number.is_none() {
            // Persisted anyway; the flag gives operators the trail
            ctx.flag("driver_name", "driver not found");
        }

        let mut tractor_id = None;
        let mut tractor_license = None;
        let mut trailer_id = None;
        let mut trailer_license = None;
        if let Some(vehicles) = raw.nested("vehicles") {
            for vehicle in vehicles {
                let unit_type = vehicle
                    .text("vehicleunittypecode")
                    .map(|t| t.to_ascii_uppercase());
                match unit_type.as_deref() {
                    Some("TRACTOR") if tractor_id.is_none() => {
                        tractor_id = vehicle.text("vehiclecompanyid").map(str::to_string);
                        tractor_license = vehicle.text("vehiclelicenseid").map(str::to_string);
                    },
                    Some("TRAILER") if trailer_id.is_none() => {
                        trailer_id = vehicle.text("vehiclecompanyid").map(str::to_string);
                        trailer_license = vehicle.text("vehiclelicenseid").map(str::to_string);
                    },
                    _ => {},
                }
            }
        }

        let violations = raw.nested("violations").and_then(render_violations);

        let entity = match (inspection_id, post_date) {
            (Some(inspection_id), Some(post_date)) => Some(Self {
                inspection_id,
                post_date,
                driver_name,
                license_number,
                tractor_id,
                tractor_license,
                trailer_id,
                trailer_license,
                violations,
            }),
            _ => None,
        };
        (entity, ctx.into_problems())
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::single(self.inspection_id.to_string())
    }
}

fn render_violations(groups: &[RawGroup]) -> Option<String> {
    let mut rendered = Vec::new();
    for group in groups {
        let parts: Vec<&str> = ["fedviocode", "violationcategory", "sectiondesc"]
            .into_iter()
            .filter_map(|key| group.text(key))
            .collect();
        if !parts.is_empty() {
            rendered.push(parts.join(" "));
        }
    }
    if rendered.is_empty() {
        None
    } else {
        Some(rendered.join(" | ").replace('"', ""))
    }
}
