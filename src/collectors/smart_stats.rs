//! Walker for the `arcconf getsmartstats` XML output
//!
//! arcconf prints free text around one or more XML fragments rather than a
//! single document:
//!
//! ```text
//! Controllers found: 1
//! <SmartStats controllerID="0">
//! <PhysicalDriveSmartStats channel="0" id="0">
//! <Attribute id="0x09" name="Power-On Hours" rawValue="21734"></Attribute>
//! </PhysicalDriveSmartStats>
//! </SmartStats>
//! Command completed successfully.
//! ```
//!
//! Samples are committed once per top-level fragment, so a broken fragment
//! only loses its own samples.

use crate::error::CollectorError;
use crate::metrics::{parse_number, MetricSample, SMART_ATTRIBUTE};
use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const DRIVE_ELEMENT: &[u8] = b"PhysicalDriveSmartStats";
const ATTRIBUTE_ELEMENT: &[u8] = b"Attribute";

/// Result of walking SMART output
///
/// `samples` holds everything extracted from complete fragments. `error` is
/// set when the walk stopped early on malformed input.
#[derive(Debug, Default)]
pub struct SmartStatsReport {
    pub samples: Vec<MetricSample>,
    pub drives: usize,
    pub error: Option<CollectorError>,
}

impl SmartStatsReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// State of the fragment currently being read
#[derive(Default)]
struct Fragment {
    depth: usize,
    drive: Option<String>,
    drives: usize,
    samples: Vec<MetricSample>,
}

impl Fragment {
    fn start(&mut self, element: &BytesStart<'_>, is_empty: bool) {
        match element.name().as_ref() {
            DRIVE_ELEMENT => {
                self.drives += 1;
                if !is_empty {
                    let drive = attribute_value(element, b"id").unwrap_or_default();
                    debug!("Reading SMART attributes for drive '{}'", drive);
                    self.drive = Some(drive);
                }
            }
            ATTRIBUTE_ELEMENT => {
                if let Some(drive) = &self.drive {
                    if let Some(sample) = attribute_sample(element, drive) {
                        self.samples.push(sample);
                    }
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        if name == DRIVE_ELEMENT {
            self.drive = None;
        }
    }
}

/// Walk SMART output and extract one sample per drive attribute
pub fn parse_smart_stats(output: &str) -> SmartStatsReport {
    let mut reader = Reader::from_str(output);
    reader.trim_text(true);
    reader.check_end_names(true);

    let mut report = SmartStatsReport::default();
    let mut fragment = Fragment::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                fragment.depth += 1;
                fragment.start(e, false);
            }
            Ok(Event::Empty(ref e)) => {
                fragment.start(e, true);
                if fragment.depth == 0 {
                    commit(&mut report, &mut fragment);
                }
            }
            Ok(Event::End(ref e)) => {
                fragment.end(e.name().as_ref());
                fragment.depth = fragment.depth.saturating_sub(1);
                if fragment.depth == 0 {
                    commit(&mut report, &mut fragment);
                }
            }
            Ok(Event::DocType(_)) => {
                report.error = Some(CollectorError::ParseError(format!(
                    "DTD declaration at byte {} is not accepted",
                    reader.buffer_position()
                )));
                break;
            }
            Ok(Event::Eof) => {
                if fragment.depth > 0 {
                    report.error = Some(CollectorError::ParseError(format!(
                        "output ended inside an element ({} left open)",
                        fragment.depth
                    )));
                }
                break;
            }
            Err(e) => {
                report.error = Some(CollectorError::Xml {
                    position: reader.buffer_position(),
                    source: e,
                });
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if report.error.is_some() && !fragment.samples.is_empty() {
        warn!(
            "Discarding {} SMART samples from a malformed fragment",
            fragment.samples.len()
        );
    }

    report
}

fn commit(report: &mut SmartStatsReport, fragment: &mut Fragment) {
    let done = std::mem::take(fragment);
    report.drives += done.drives;
    report.samples.extend(done.samples);
}

fn attribute_sample(element: &BytesStart<'_>, drive: &str) -> Option<MetricSample> {
    let code = attribute_value(element, b"id").unwrap_or_default();
    let name = attribute_value(element, b"name").unwrap_or_default();

    let value = match attribute_value(element, b"rawValue").as_deref().map(parse_number) {
        Some(Some(value)) => value,
        _ => {
            debug!(
                "Skipping SMART attribute '{}' on drive '{}': missing or non-numeric rawValue",
                code, drive
            );
            return None;
        }
    };

    Some(
        MetricSample::new(SMART_ATTRIBUTE, value)
            .with_label("code", code)
            .with_label("name", name)
            .with_label("drive", drive),
    )
}

/// Read and unescape an attribute; malformed attributes count as absent
fn attribute_value(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    for attr in element.attributes() {
        let attr = match attr {
            Ok(attr) => attr,
            Err(e) => {
                debug!("Ignoring malformed attribute: {}", e);
                continue;
            }
        };
        if attr.key.as_ref() == key {
            return match attr.unescape_value() {
                Ok(value) => Some(value.into_owned()),
                Err(e) => {
                    debug!("Ignoring attribute with bad escape: {}", e);
                    None
                }
            };
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = r#"Controllers found: 1
<SmartStats controllerID="0" deviceName="Adaptec ASR8405" time="Mon Jan  1 12:00:00 2024">
<PhysicalDriveSmartStats channel="0" id="0" nonSpinning="false" isDescriptionAvailable="true" >
<Attribute id="0x01" name="Read Error Rate" normalizedCurrent="200" normalizedWorst="200" thresholdValue="51" rawValue="0" Status="OK" ></Attribute>
<Attribute id="0x09" name="Power-On Hours" normalizedCurrent="71" normalizedWorst="71" thresholdValue="0" rawValue="21734" Status="OK" ></Attribute>
</PhysicalDriveSmartStats>
<PhysicalDriveSmartStats channel="0" id="1" nonSpinning="false" isDescriptionAvailable="true" >
<Attribute id="0x05" name="Reallocated Sectors Count" rawValue="8"/>
<Attribute id="0xC2" name="Temperature" rawValue="34"/>
</PhysicalDriveSmartStats>
</SmartStats>

Command completed successfully.
"#;

    type Row = (String, String, String, f64);

    fn row(code: &str, name: &str, drive: &str, value: f64) -> Row {
        (code.to_string(), name.to_string(), drive.to_string(), value)
    }

    fn summary(samples: &[MetricSample]) -> Vec<Row> {
        samples
            .iter()
            .map(|s| {
                (
                    s.label("code").unwrap_or("?").to_string(),
                    s.label("name").unwrap_or("?").to_string(),
                    s.label("drive").unwrap_or("?").to_string(),
                    s.value(),
                )
            })
            .collect()
    }

    #[test]
    fn test_two_drives_two_attributes_each() {
        let report = parse_smart_stats(OUTPUT);
        assert!(report.is_complete());
        assert_eq!(report.drives, 2);
        assert_eq!(report.samples.len(), 4);
        assert_eq!(
            summary(&report.samples),
            vec![
                row("0x01", "Read Error Rate", "0", 0.0),
                row("0x09", "Power-On Hours", "0", 21734.0),
                row("0x05", "Reallocated Sectors Count", "1", 8.0),
                row("0xC2", "Temperature", "1", 34.0),
            ]
        );
        assert!(report.samples.iter().all(|s| s.name() == SMART_ATTRIBUTE));
    }

    #[test]
    fn test_label_order() {
        let report = parse_smart_stats(OUTPUT);
        let keys: Vec<&str> = report.samples[0].labels().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["code", "name", "drive"]);
    }

    #[test]
    fn test_multiple_top_level_fragments() {
        let output = r#"
<PhysicalDriveSmartStats id="3"><Attribute id="0x01" name="A" rawValue="1"/></PhysicalDriveSmartStats>
some text between fragments
<PhysicalDriveSmartStats id="4"><Attribute id="0x02" name="B" rawValue="2"/></PhysicalDriveSmartStats>
"#;
        let report = parse_smart_stats(output);
        assert!(report.is_complete());
        let drives: Vec<&str> = report
            .samples
            .iter()
            .filter_map(|s| s.label("drive"))
            .collect();
        assert_eq!(drives, vec!["3", "4"]);
    }

    #[test]
    fn test_missing_attributes_become_empty_labels() {
        let output = r#"<PhysicalDriveSmartStats><Attribute rawValue="7"/></PhysicalDriveSmartStats>"#;
        let report = parse_smart_stats(output);
        assert_eq!(
            summary(&report.samples),
            vec![row("", "", "", 7.0)]
        );
    }

    #[test]
    fn test_missing_or_bad_raw_value_skips_sample() {
        let output = r#"<PhysicalDriveSmartStats id="0">
<Attribute id="0x01" name="No value"/>
<Attribute id="0x02" name="Text value" rawValue="n/a"/>
<Attribute id="0x03" name="Good" rawValue="5"/>
</PhysicalDriveSmartStats>"#;
        let report = parse_smart_stats(output);
        assert!(report.is_complete());
        assert_eq!(summary(&report.samples), vec![row("0x03", "Good", "0", 5.0)]);
    }

    #[test]
    fn test_attributes_outside_drive_record_are_ignored() {
        let output = r#"<SmartStats>
<Attribute id="0x01" name="Orphan" rawValue="1"/>
<PhysicalDriveSmartStats id="2"></PhysicalDriveSmartStats>
<Attribute id="0x02" name="After" rawValue="2"/>
</SmartStats>"#;
        let report = parse_smart_stats(output);
        assert!(report.is_complete());
        assert!(report.samples.is_empty());
        assert_eq!(report.drives, 1);
    }

    #[test]
    fn test_escaped_attribute_values() {
        let output = r#"<PhysicalDriveSmartStats id="a&amp;b"><Attribute id="1" name="&quot;Quoted&quot;" rawValue="3"/></PhysicalDriveSmartStats>"#;
        let report = parse_smart_stats(output);
        assert_eq!(
            summary(&report.samples),
            vec![row("1", "\"Quoted\"", "a&b", 3.0)]
        );
    }

    #[test]
    fn test_malformed_fragment_keeps_earlier_samples() {
        let output = r#"<PhysicalDriveSmartStats id="0"><Attribute id="0x01" name="Good" rawValue="1"/></PhysicalDriveSmartStats>
<PhysicalDriveSmartStats id="1"><Attribute id="0x02" name="Lost" rawValue="2"/></Broken>
"#;
        let report = parse_smart_stats(output);
        assert!(!report.is_complete());
        assert!(matches!(report.error, Some(CollectorError::Xml { .. })));
        assert_eq!(summary(&report.samples), vec![row("0x01", "Good", "0", 1.0)]);
    }

    #[test]
    fn test_truncated_output_is_reported() {
        let output = r#"<PhysicalDriveSmartStats id="0"><Attribute id="0x01" name="A" rawValue="1"/>"#;
        let report = parse_smart_stats(output);
        assert!(!report.is_complete());
        assert!(report.samples.is_empty());
    }

    #[test]
    fn test_doctype_is_rejected() {
        let output = r#"<!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<PhysicalDriveSmartStats id="0"><Attribute id="1" name="&xxe;" rawValue="1"/></PhysicalDriveSmartStats>"#;
        let report = parse_smart_stats(output);
        assert!(!report.is_complete());
        assert!(report.samples.is_empty());
    }

    #[test]
    fn test_no_xml_at_all() {
        let report = parse_smart_stats("Controllers found: 0\nCommand completed successfully.\n");
        assert!(report.is_complete());
        assert!(report.samples.is_empty());
        assert_eq!(report.drives, 0);
    }
}
