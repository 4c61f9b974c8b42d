//! Field name mapping
//!
//! The same logical column arrives under many names across feeds
//! ("Driver ID", "driver_id", "DriverID"). Each entity declares a schema of
//! canonical snake_case fields with accepted aliases; incoming names resolve
//! case- and separator-insensitively, and names no schema claims are kept as
//! metadata rather than dropped.

use std::collections::HashMap;
use tracing::warn;

/// Collapse a field name to its comparison form: lowercase with every
/// non-alphanumeric character removed ("Vehicle_ID" -> "vehicleid").
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// One canonical field in an entity schema
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
}

impl FieldSpec {
    pub fn required(canonical: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            canonical,
            aliases,
            required: true,
        }
    }

    pub fn optional(canonical: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            canonical,
            aliases,
            required: false,
        }
    }
}

/// Object keys tried, in order, when a JSON body wraps its record array in
/// an envelope object instead of being a bare array
const DEFAULT_COLLECTION_KEYS: &[&'static str] = &["records", "items", "data", "rows", "results"];

/// The result of resolving one incoming field name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedName {
    /// The name (or one of its aliases) is declared by the schema
    Canonical(&'static str),
    /// No schema field claims the name; carries the normalized form under
    /// which the value is retained as metadata
    Unmapped(String),
}

/// Immutable per-entity mapping table, built once at startup
#[derive(Debug)]
pub struct EntitySchema {
    entity: &'static str,
    fields: Vec<FieldSpec>,
    lookup: HashMap<String, &'static str>,
    collection_keys: Vec<&'static str>,
}

impl EntitySchema {
    /// Build the normalized alias table for `fields`.
    ///
    /// Alias sets are expected to be disjoint after normalization. A
    /// collision logs a configuration warning and the first declaration
    /// wins, so declaration order is part of the schema contract.
    pub fn new(entity: &'static str, fields: Vec<FieldSpec>) -> Self {
        let mut lookup: HashMap<String, &'static str> = HashMap::new();

        for field in &fields {
            for name in std::iter::once(field.canonical).chain(field.aliases.iter().copied()) {
                let key = normalize_name(name);
                if key.is_empty() {
                    continue;
                }
                if let Some(existing) = lookup.get(key.as_str()) {
                    if *existing != field.canonical {
                        warn!(
                            entity,
                            alias = name,
                            kept = existing,
                            ignored = field.canonical,
                            "Alias declared by two fields; keeping first declaration"
                        );
                    }
                    continue;
                }
                lookup.insert(key, field.canonical);
            }
        }

        Self {
            entity,
            fields,
            lookup,
            collection_keys: DEFAULT_COLLECTION_KEYS.to_vec(),
        }
    }

    /// Try `keys` ahead of the default envelope names when looking for the
    /// record array in a JSON object body
    pub fn with_collection_keys(mut self, keys: &'static [&'static str]) -> Self {
        let mut all: Vec<&'static str> = keys.to_vec();
        all.extend(DEFAULT_COLLECTION_KEYS);
        self.collection_keys = all;
        self
    }

    pub fn collection_keys(&self) -> &[&'static str] {
        &self.collection_keys
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Canonical names of every required field, in declaration order
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.canonical)
    }

    /// Resolve one incoming field name against the alias table
    pub fn resolve(&self, name: &str) -> ResolvedName {
        let key = normalize_name(name);
        match self.lookup.get(key.as_str()) {
            Some(canonical) => ResolvedName::Canonical(canonical),
            None => ResolvedName::Unmapped(key),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_schema() -> EntitySchema {
        EntitySchema::new(
            "vehicle_event",
            vec![
                FieldSpec::required("vehicle_id", &["Vehicle ID", "Unit_ID", "Truck_ID"]),
                FieldSpec::required("maintenance_type", &["Maintenance Type", "Service_Type"]),
                FieldSpec::optional("due_date", &["Due Date", "Scheduled_Date"]),
            ],
        )
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Vehicle_ID"), "vehicleid");
        assert_eq!(normalize_name("vehicle id"), "vehicleid");
        assert_eq!(normalize_name("VehicleID"), "vehicleid");
        assert_eq!(normalize_name("Violation Duration (HH:MM:SS)"), "violationdurationhhmmss");
        assert_eq!(normalize_name("  "), "");
    }

    #[test]
    fn test_resolve_aliases() {
        let schema = sample_schema();
        for name in ["Vehicle_ID", "vehicle id", "VehicleID", "TRUCK_ID", "unit id"] {
            assert_eq!(
                schema.resolve(name),
                ResolvedName::Canonical("vehicle_id"),
                "failed for {name}"
            );
        }
        assert_eq!(
            schema.resolve("scheduled_date"),
            ResolvedName::Canonical("due_date")
        );
    }

    #[test]
    fn test_canonical_name_is_implicit_alias() {
        let schema = sample_schema();
        assert_eq!(
            schema.resolve("maintenance_type"),
            ResolvedName::Canonical("maintenance_type")
        );
    }

    #[test]
    fn test_unmapped_name_retained_normalized() {
        let schema = sample_schema();
        assert_eq!(
            schema.resolve("Fleet Region"),
            ResolvedName::Unmapped("fleetregion".to_string())
        );
    }

    #[test]
    fn test_duplicate_alias_first_declaration_wins() {
        let schema = EntitySchema::new(
            "conflicted",
            vec![
                FieldSpec::required("first", &["Shared Name"]),
                FieldSpec::optional("second", &["shared_name"]),
            ],
        );
        assert_eq!(schema.resolve("SHARED NAME"), ResolvedName::Canonical("first"));
    }

    #[test]
    fn test_required_fields_in_declaration_order() {
        let schema = sample_schema();
        let required: Vec<_> = schema.required_fields().collect();
        assert_eq!(required, vec!["vehicle_id", "maintenance_type"]);
    }

    #[test]
    fn test_entity_collection_keys_come_first() {
        let schema = sample_schema().with_collection_keys(&["violations"]);
        assert_eq!(schema.collection_keys()[0], "violations");
        assert!(schema.collection_keys().contains(&"records"));
    }

    proptest! {
        // Any mix of casing and separator characters must resolve to the
        // same normalized form as the undecorated words.
        #[test]
        fn prop_normalize_ignores_case_and_separators(
            words in prop::collection::vec("[a-z][a-z0-9]{0,7}", 1..4),
            sep_index in 0usize..5,
            upper_mask in any::<u8>(),
        ) {
            let separators = ["_", " ", "-", "", "__"];
            let sep = separators[sep_index % separators.len()];
            let decorated: Vec<String> = words
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    if (upper_mask >> (i % 8)) & 1 == 1 {
                        w.to_uppercase()
                    } else {
                        w.clone()
                    }
                })
                .collect();
            prop_assert_eq!(normalize_name(&decorated.join(sep)), words.concat());
        }
    }
}
