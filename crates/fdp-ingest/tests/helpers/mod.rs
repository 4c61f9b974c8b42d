//! Test helpers for FDP ingest integration tests
//!
//! The readers only accept paths, so every fixture is written into the
//! test's tempdir and handed to the pipeline as a file.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Install a test-friendly tracing subscriber; later calls are no-ops
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Write one fixture file and hand back its path
pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Maintenance CSV under the fleet system's export headers
pub fn maintenance_csv(rows: &[(&str, &str, &str)]) -> String {
    let mut csv = String::from("Unit_ID,Service_Type,Scheduled_Date\n");
    for (vehicle, service, due) in rows {
        csv.push_str(&format!("{vehicle},{service},{due}\n"));
    }
    csv
}

/// Driver score CSV in the telematics vendor's export headers
pub fn scores_csv(rows: &[(&str, &str, &str)]) -> String {
    let mut csv = String::from("Driver ID,Minutes Analyzed,Driver Score\n");
    for (driver, minutes, score) in rows {
        csv.push_str(&format!("{driver},{minutes},{score}\n"));
    }
    csv
}

/// Wrap inspection fragments in the feed's document element
pub fn inspections_doc(fragments: &[&str]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Inspections>{}</Inspections>",
        fragments.join("")
    )
}

/// A fully populated roadside inspection
pub const FULL_INSPECTION: &str = r#"
<Inspection>
  <InspMain>
    <inspectionId>90210</inspectionId>
    <InspectionPostDate>2025-02-11</InspectionPostDate>
  </InspMain>
  <Drivers>
    <Driver>
      <DriverLastName>Osei</DriverLastName>
      <DriverLicenseID>DL-778</DriverLicenseID>
    </Driver>
  </Drivers>
  <Vehicles>
    <Vehicle>
      <VehicleUnitTypeCode>TRACTOR</VehicleUnitTypeCode>
      <VehicleCompanyID>T-31</VehicleCompanyID>
      <VehicleLicenseID>PLT-100</VehicleLicenseID>
    </Vehicle>
    <Vehicle>
      <VehicleUnitTypeCode>TRAILER</VehicleUnitTypeCode>
      <VehicleCompanyID>TR-77</VehicleCompanyID>
      <VehicleLicenseID>PLT-200</VehicleLicenseID>
    </Vehicle>
  </Vehicles>
  <Violations>
    <Violation>
      <FedVioCode>395.8A</FedVioCode>
      <ViolationCategory>HOS</ViolationCategory>
      <SectionDesc>Log not current</SectionDesc>
    </Violation>
  </Violations>
</Inspection>
"#;

/// An inspection whose feed record carries no driver block at all
pub const DRIVERLESS_INSPECTION: &str = r#"
<Inspection>
  <InspMain>
    <inspectionId>90211</inspectionId>
    <InspectionPostDate>2025-02-12</InspectionPostDate>
  </InspMain>
  <Vehicles>
    <Vehicle>
      <VehicleUnitTypeCode>TRACTOR</VehicleUnitTypeCode>
      <VehicleCompanyID>T-44</VehicleCompanyID>
      <VehicleLicenseID>PLT-300</VehicleLicenseID>
    </Vehicle>
  </Vehicles>
</Inspection>
"#;

/// Violation items wrapped in the feed's envelope object
pub fn violations_json(items: &[&str]) -> String {
    format!("{{\"violations\": [{}]}}", items.join(", "))
}
