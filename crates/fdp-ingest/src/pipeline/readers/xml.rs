//! XML reading
//!
//! Feeds arrive as a document element wrapping one element per record.
//! Each record element is flattened: leaf children become scalar fields,
//! a child whose children are all leaves merges those leaves into the
//! record, and a container of repeated elements becomes nested groups
//! stored under the container's name. Attributes are not read; the feeds
//! carry everything in element text.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

use fdp_common::{FdpError, Result};

use super::{iso_timestamp, source_label, RawGroup, RawRecord, RawValue, ReadOutcome};
use crate::pipeline::mapping::{normalize_name, EntitySchema};
use crate::pipeline::outcome::RecordDescriptor;

pub fn read_xml(path: &Path, schema: &EntitySchema) -> Result<ReadOutcome> {
    let input = std::fs::read_to_string(path)?;
    read_xml_str(&input, schema, &source_label(path))
}

pub(crate) fn read_xml_str(
    input: &str,
    schema: &EntitySchema,
    file: &str,
) -> Result<ReadOutcome> {
    let root = parse_tree(input)?;
    let mut outcome = ReadOutcome::default();

    for (index, element) in root.children.iter().enumerate() {
        let label = format!("{file}:record-{}", index + 1);
        if element.children.is_empty() {
            outcome.skipped.push(RecordDescriptor::record(
                label,
                format!("element <{}> has no fields", element.tag),
            ));
            continue;
        }
        outcome.records.push(flatten_record(element, schema, &label));
    }
    Ok(outcome)
}

/// Element tree node; attributes are dropped and text is whitespace-trimmed
#[derive(Debug)]
struct XmlNode {
    tag: String,
    text: String,
    children: Vec<XmlNode>,
}

fn parse_tree(input: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(input);
    // Sentinel root collects the document element so the stack never empties
    let mut stack = vec![XmlNode {
        tag: String::new(),
        text: String::new(),
        children: Vec::new(),
    }];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                stack.push(XmlNode {
                    tag: tag_name(&start),
                    text: String::new(),
                    children: Vec::new(),
                });
            },
            Ok(Event::Empty(start)) => {
                let node = XmlNode {
                    tag: tag_name(&start),
                    text: String::new(),
                    children: Vec::new(),
                };
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            },
            Ok(Event::End(_)) => {
                if stack.len() > 1 {
                    if let Some(node) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(node);
                        }
                    }
                }
            },
            Ok(Event::Text(text)) => {
                let unescaped = text
                    .unescape()
                    .map_err(|e| FdpError::Parse(format!("Bad XML text: {e}")))?;
                append_text(&mut stack, unescaped.trim());
            },
            Ok(Event::CData(cdata)) => {
                let bytes = cdata.into_inner();
                let text = String::from_utf8_lossy(&bytes);
                append_text(&mut stack, text.trim());
            },
            Ok(Event::Eof) => break,
            Ok(_) => {},
            Err(e) => return Err(FdpError::Parse(format!("Malformed XML: {e}"))),
        }
    }

    if stack.len() != 1 {
        return Err(FdpError::Parse(
            "Unclosed element at end of document".to_string(),
        ));
    }
    let Some(sentinel) = stack.pop() else {
        return Err(FdpError::Parse("Document has no root element".to_string()));
    };
    sentinel
        .children
        .into_iter()
        .next()
        .ok_or_else(|| FdpError::Parse("Document has no root element".to_string()))
}

fn tag_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn append_text(stack: &mut [XmlNode], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(node) = stack.last_mut() {
        if !node.text.is_empty() {
            node.text.push(' ');
        }
        node.text.push_str(text);
    }
}

fn flatten_record(element: &XmlNode, schema: &EntitySchema, label: &str) -> RawRecord {
    let mut record = RawRecord::new(label);
    for child in &element.children {
        flatten_into(&mut record, child, schema);
    }
    record
}

fn flatten_into(record: &mut RawRecord, child: &XmlNode, schema: &EntitySchema) {
    if child.children.is_empty() {
        if !child.text.is_empty() {
            record.push(schema.resolve(&child.tag), text_value(&child.text));
        }
        return;
    }
    if let Some(groups) = repeated_groups(child) {
        record.push(schema.resolve(&child.tag), RawValue::Nested(groups));
        return;
    }
    if child.children.iter().all(|c| c.children.is_empty()) {
        // Header-style block such as the main section of an inspection;
        // its leaves belong to the record itself
        for leaf in &child.children {
            if !leaf.text.is_empty() {
                record.push(schema.resolve(&leaf.tag), text_value(&leaf.text));
            }
        }
        return;
    }
    record.push(
        schema.resolve(&child.tag),
        RawValue::Nested(vec![collect_leaves(child)]),
    );
}

/// A container whose children repeat one tag is a collection, except for a
/// lone leaf child which reads better as a scalar
fn repeated_groups(node: &XmlNode) -> Option<Vec<RawGroup>> {
    let first = node.children.first()?;
    if node.children.iter().any(|c| c.tag != first.tag) {
        return None;
    }
    if node.children.len() == 1 && first.children.is_empty() {
        return None;
    }
    Some(node.children.iter().map(collect_leaves).collect())
}

fn collect_leaves(node: &XmlNode) -> RawGroup {
    let mut group = RawGroup::default();
    if node.children.is_empty() {
        if !node.text.is_empty() {
            group.push(normalize_name(&node.tag), text_value(&node.text));
        }
        return group;
    }
    collect_leaves_into(node, &mut group);
    group
}

fn collect_leaves_into(node: &XmlNode, group: &mut RawGroup) {
    for child in &node.children {
        if child.children.is_empty() {
            if !child.text.is_empty() {
                group.push(normalize_name(&child.tag), text_value(&child.text));
            }
        } else {
            collect_leaves_into(child, group);
        }
    }
}

fn text_value(text: &str) -> RawValue {
    match iso_timestamp(text) {
        Some(ts) => RawValue::Timestamp(ts),
        None => RawValue::Text(text.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::mapping::FieldSpec;

    fn inspection_like_schema() -> EntitySchema {
        EntitySchema::new(
            "dot_inspection",
            vec![
                FieldSpec::required("inspection_id", &["InspectionID", "Inspection_ID"]),
                FieldSpec::required("post_date", &["PostDate", "Inspection_Date"]),
                FieldSpec::optional("drivers", &[]),
                FieldSpec::optional("vehicles", &[]),
                FieldSpec::optional("violations", &[]),
            ],
        )
    }

    const INSPECTION_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Inspections>
  <Inspection>
    <InspMain>
      <InspectionID>90210</InspectionID>
      <PostDate>2025-02-14</PostDate>
    </InspMain>
    <Drivers>
      <Driver>
        <DriverName>R. Alvarez</DriverName>
        <LicenseNumber>D5521870</LicenseNumber>
      </Driver>
    </Drivers>
    <Vehicles>
      <Vehicle>
        <UnitType>Tractor</UnitType>
        <UnitID>T-204</UnitID>
        <LicensePlate>KPX300</LicensePlate>
      </Vehicle>
      <Vehicle>
        <UnitType>Trailer</UnitType>
        <UnitID>TR-88</UnitID>
        <LicensePlate>UTL221</LicensePlate>
      </Vehicle>
    </Vehicles>
    <Violations>
      <Violation>
        <FedVioCode>395.8A</FedVioCode>
        <ViolationCategory>HOS</ViolationCategory>
        <SectionDesc>"Log not current"</SectionDesc>
      </Violation>
    </Violations>
  </Inspection>
</Inspections>"#;

    #[test]
    fn test_inspection_layout_flattens() {
        let schema = inspection_like_schema();
        let outcome = read_xml_str(INSPECTION_XML, &schema, "insp.xml").unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.skipped.is_empty());

        let record = &outcome.records[0];
        assert_eq!(record.source(), "insp.xml:record-1");
        assert_eq!(
            record.get("inspection_id"),
            Some(&RawValue::Text("90210".into()))
        );
        assert_eq!(
            record.get("post_date"),
            Some(&RawValue::Text("2025-02-14".into()))
        );

        let drivers = record.nested("drivers").unwrap();
        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].text("drivername"), Some("R. Alvarez"));
        assert_eq!(drivers[0].text("licensenumber"), Some("D5521870"));

        let vehicles = record.nested("vehicles").unwrap();
        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0].text("unittype"), Some("Tractor"));
        assert_eq!(vehicles[1].text("unitid"), Some("TR-88"));

        let violations = record.nested("violations").unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].text("fedviocode"), Some("395.8A"));
        assert_eq!(violations[0].text("sectiondesc"), Some("\"Log not current\""));
    }

    #[test]
    fn test_record_without_driver_section_still_reads() {
        let schema = inspection_like_schema();
        let input = "\
<Inspections>
  <Inspection>
    <InspMain>
      <InspectionID>777</InspectionID>
      <PostDate>2025-03-01</PostDate>
    </InspMain>
    <Vehicles>
      <Vehicle>
        <UnitType>Tractor</UnitType>
        <UnitID>T-1</UnitID>
      </Vehicle>
    </Vehicles>
  </Inspection>
</Inspections>";
        let outcome = read_xml_str(input, &schema, "insp.xml").unwrap();
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert!(record.nested("drivers").is_none());
        // A single repeated element still forms a one-entry collection
        assert_eq!(record.nested("vehicles").unwrap().len(), 1);
    }

    #[test]
    fn test_leaf_record_element_is_skipped() {
        let schema = inspection_like_schema();
        let input = "\
<Inspections>
  <Inspection>stray text</Inspection>
  <Inspection>
    <InspMain>
      <InspectionID>5</InspectionID>
      <PostDate>2025-01-01</PostDate>
    </InspMain>
  </Inspection>
</Inspections>";
        let outcome = read_xml_str(input, &schema, "insp.xml").unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].source, "insp.xml:record-1");
        assert!(outcome.skipped[0].reason.contains("no fields"));
    }

    #[test]
    fn test_unmapped_leaves_land_in_metadata() {
        let schema = inspection_like_schema();
        let input = "\
<Inspections>
  <Inspection>
    <InspMain>
      <InspectionID>12</InspectionID>
      <PostDate>2025-01-02</PostDate>
      <ReportState>MT</ReportState>
    </InspMain>
  </Inspection>
</Inspections>";
        let outcome = read_xml_str(input, &schema, "insp.xml").unwrap();
        let record = &outcome.records[0];
        assert_eq!(record.metadata().len(), 1);
        assert_eq!(record.metadata()[0].0, "reportstate");
    }

    #[test]
    fn test_malformed_documents_are_errors() {
        let schema = inspection_like_schema();
        // Mismatched close tag
        let crossed = "<Inspections><Inspection></Inspections>";
        assert!(matches!(
            read_xml_str(crossed, &schema, "bad.xml"),
            Err(FdpError::Parse(_))
        ));
        // Truncated document
        let truncated = "<Inspections><Inspection><InspMain>";
        assert!(matches!(
            read_xml_str(truncated, &schema, "bad.xml"),
            Err(FdpError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_elements_and_entities() {
        let schema = inspection_like_schema();
        let input = "\
<Inspections>
  <Inspection>
    <InspMain>
      <InspectionID>13</InspectionID>
      <PostDate/>
      <CarrierName>Hill &amp; Sons</CarrierName>
    </InspMain>
  </Inspection>
</Inspections>";
        let outcome = read_xml_str(input, &schema, "insp.xml").unwrap();
        let record = &outcome.records[0];
        assert_eq!(record.get("post_date"), None);
        assert_eq!(
            record.metadata()[0].1,
            RawValue::Text("Hill & Sons".into())
        );
    }
}
