//! Core domain types shared across FDP components

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::FdpError;

/// The fleet data feeds the platform ingests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Monthly driver safety-score exports
    DriverScores,
    /// DOT roadside inspection feeds
    DotInspections,
    /// Hours-of-service violation reports
    HosViolations,
    /// Programmed maintenance schedules
    Maintenance,
}

impl DataSource {
    pub const ALL: [DataSource; 4] = [
        DataSource::DriverScores,
        DataSource::DotInspections,
        DataSource::HosViolations,
        DataSource::Maintenance,
    ];

    /// Stable slug used in status rows, logs, and configuration
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::DriverScores => "driver_scores",
            DataSource::DotInspections => "dot_inspections",
            DataSource::HosViolations => "hos_violations",
            DataSource::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataSource {
    type Err = FdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "driver_scores" | "scores" => Ok(DataSource::DriverScores),
            "dot_inspections" | "inspections" => Ok(DataSource::DotInspections),
            "hos_violations" | "violations" => Ok(DataSource::HosViolations),
            "maintenance" => Ok(DataSource::Maintenance),
            _ => Err(FdpError::UnknownSource(s.to_string())),
        }
    }
}

/// Input file formats the readers understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Comma-separated values
    Csv,
    /// Excel-family workbooks (xlsx, xls, xlsm, xlsb, ods)
    Spreadsheet,
    /// XML documents
    Xml,
    /// JSON documents
    Json,
}

impl SourceFormat {
    /// Detect the format from a file extension, if it is one we support
    pub fn from_path(path: &Path) -> Option<SourceFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(SourceFormat::Spreadsheet),
            "xml" => Some(SourceFormat::Xml),
            "json" => Some(SourceFormat::Json),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Spreadsheet => "spreadsheet",
            SourceFormat::Xml => "xml",
            SourceFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_data_source_round_trip() {
        for source in DataSource::ALL {
            let parsed: DataSource = source.as_str().parse().unwrap();
            assert_eq!(parsed, source);
        }
    }

    #[test]
    fn test_data_source_short_names() {
        assert_eq!(
            "scores".parse::<DataSource>().unwrap(),
            DataSource::DriverScores
        );
        assert_eq!(
            "Violations".parse::<DataSource>().unwrap(),
            DataSource::HosViolations
        );
        assert!("telemetry".parse::<DataSource>().is_err());
    }

    #[test]
    fn test_data_source_serde() {
        let json = serde_json::to_string(&DataSource::DotInspections).unwrap();
        assert_eq!(json, "\"dot_inspections\"");
        let back: DataSource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DataSource::DotInspections);
    }

    #[test]
    fn test_source_format_from_path() {
        let cases = [
            ("report.csv", Some(SourceFormat::Csv)),
            ("report.XLSX", Some(SourceFormat::Spreadsheet)),
            ("data.xls", Some(SourceFormat::Spreadsheet)),
            ("feed.xml", Some(SourceFormat::Xml)),
            ("feed.json", Some(SourceFormat::Json)),
            ("notes.txt", None),
            ("no_extension", None),
        ];
        for (name, expected) in cases {
            assert_eq!(SourceFormat::from_path(&PathBuf::from(name)), expected);
        }
    }
}
