//! Parser for the `arcconf getconfig` report
//!
//! The report is a human-readable listing grouped into sections:
//!
//! ```text
//! ----------------------------------------------------------------------
//! Controller information
//! ----------------------------------------------------------------------
//!    Controller Status                        : Optimal
//!    Temperature                              : 38 C/ 100 F (Normal)
//!    --------------------------------------------------------
//!    RAID Properties
//!    --------------------------------------------------------
//!    Logical devices/Failed/Degraded          : 2/0/0
//! ```
//!
//! Only three sections are of interest. Each one maps its `name : value`
//! fields to metric samples through a plain function handler.

use crate::metrics::{
    parse_number, MetricSample, RAID_BATTERY_IS_OPTIMAL, RAID_BATTERY_TEMP_IS_OK,
    RAID_DEFUNCT_DRIVES, RAID_IS_OPTIMAL, RAID_LD_DEGRADED, RAID_LD_FAILED, RAID_LD_TOTAL,
    RAID_TEMPERATURE,
};
use log::debug;

/// Report sections that carry exported fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// `Controller information`
    Controller,
    /// `RAID Properties`
    LogicalDevices,
    /// `Controller Battery Information`
    Battery,
}

/// Maps a field to the samples it produces
type FieldHandler = fn(&Field<'_>) -> Vec<MetricSample>;

/// Header line (trimmed) to section lookup
const SECTION_HEADERS: [(&str, Section); 3] = [
    ("Controller information", Section::Controller),
    ("RAID Properties", Section::LogicalDevices),
    ("Controller Battery Information", Section::Battery),
];

impl Section {
    /// Recognize a section header; the line must match exactly after trimming
    pub fn from_header(line: &str) -> Option<Self> {
        let line = line.trim();
        SECTION_HEADERS
            .iter()
            .find(|(header, _)| *header == line)
            .map(|(_, section)| *section)
    }

    fn handler(self) -> FieldHandler {
        match self {
            Section::Controller => controller_fields,
            Section::LogicalDevices => logical_device_fields,
            Section::Battery => battery_fields,
        }
    }

    /// Map one field of this section to metric samples
    pub fn handle(self, field: &Field<'_>) -> Vec<MetricSample> {
        (self.handler())(field)
    }
}

/// A `name : value` pair from a report line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

impl<'a> Field<'a> {
    /// Split a line on its first colon
    ///
    /// Everything after the first colon belongs to the value, so values such
    /// as `12:30:00` survive intact.
    pub fn parse(line: &'a str) -> Option<Self> {
        let (name, value) = line.split_once(':')?;
        Some(Self {
            name: name.trim(),
            value: value.trim(),
        })
    }
}

/// Whether a line closes the current section
fn is_section_end(line: &str) -> bool {
    line.is_empty() || line.trim().starts_with("---")
}

/// Parse a full `getconfig` report into metric samples
///
/// Never fails: unknown sections, unknown fields and malformed values are
/// skipped. The output depends only on the input text.
pub fn parse_config_report(report: &str) -> Vec<MetricSample> {
    let mut samples = Vec::new();
    let mut lines = report.lines();

    while let Some(line) = lines.next() {
        let Some(section) = Section::from_header(line) else {
            continue;
        };
        debug!("Entering report section {:?}", section);

        // The header is followed by an underline
        lines.next();

        for line in lines.by_ref() {
            if is_section_end(line) {
                break;
            }
            if let Some(field) = Field::parse(line) {
                samples.extend(section.handle(&field));
            }
        }
    }

    samples
}

fn controller_fields(field: &Field<'_>) -> Vec<MetricSample> {
    match field.name {
        "Controller Status" => vec![MetricSample::flag(
            RAID_IS_OPTIMAL,
            field.value == "Optimal",
        )],
        "Temperature" => {
            // e.g. "38 C/ 100 F (Normal)"
            let celsius = field.value.split_whitespace().next().unwrap_or("");
            number_sample(RAID_TEMPERATURE, celsius, field)
        }
        "Defunct disk drive count" => number_sample(RAID_DEFUNCT_DRIVES, field.value, field),
        _ => Vec::new(),
    }
}

fn logical_device_fields(field: &Field<'_>) -> Vec<MetricSample> {
    if field.name != "Logical devices/Failed/Degraded" {
        return Vec::new();
    }

    let parts: Vec<&str> = field.value.split('/').collect();
    [RAID_LD_TOTAL, RAID_LD_FAILED, RAID_LD_DEGRADED]
        .into_iter()
        .enumerate()
        .flat_map(|(i, name)| match parts.get(i) {
            Some(part) => number_sample(name, part, field),
            None => {
                debug!(
                    "Skipping {}: '{}' has no position {}",
                    name, field.value, i
                );
                Vec::new()
            }
        })
        .collect()
}

fn battery_fields(field: &Field<'_>) -> Vec<MetricSample> {
    match field.name {
        "Status" => vec![MetricSample::flag(
            RAID_BATTERY_IS_OPTIMAL,
            field.value == "Optimal",
        )],
        // Reported as "Over temperature : No" when the battery is fine
        "Over temperature" => vec![MetricSample::flag(
            RAID_BATTERY_TEMP_IS_OK,
            field.value == "No",
        )],
        _ => Vec::new(),
    }
}

fn number_sample(name: &'static str, raw: &str, field: &Field<'_>) -> Vec<MetricSample> {
    match parse_number(raw) {
        Some(value) => vec![MetricSample::new(name, value)],
        None => {
            debug!(
                "Skipping {}: field '{}' has non-numeric value '{}'",
                name, field.name, field.value
            );
            Vec::new()
        }
    }
}
