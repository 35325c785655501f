//! Metric samples produced by the report parsers
//!
//! Every parser in this crate reduces controller output to a flat list of
//! [`MetricSample`] values. A sample is a metric name, an ordered label set and
//! a numeric value; the namespace prefix is applied later by the emitter.

/// Controller reports `Optimal` status
pub const RAID_IS_OPTIMAL: &str = "raid_is_optimal";
/// Controller temperature in degrees Celsius
pub const RAID_TEMPERATURE: &str = "raid_temperature";
/// Number of defunct disk drives
pub const RAID_DEFUNCT_DRIVES: &str = "raid_defunct_drives";
/// Total number of logical devices
pub const RAID_LD_TOTAL: &str = "raid_ld_total";
/// Number of failed logical devices
pub const RAID_LD_FAILED: &str = "raid_ld_failed";
/// Number of degraded logical devices
pub const RAID_LD_DEGRADED: &str = "raid_ld_degraded";
/// Battery reports `Optimal` status
pub const RAID_BATTERY_IS_OPTIMAL: &str = "raid_battery_is_optimal";
/// Battery is not over temperature
pub const RAID_BATTERY_TEMP_IS_OK: &str = "raid_battery_temp_is_ok";
/// Raw value of a drive SMART attribute
pub const SMART_ATTRIBUTE: &str = "smart_attribute";

/// A single normalized measurement
///
/// Labels keep the order in which the producer attached them, which is also
/// the order they are written in.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    name: &'static str,
    labels: Vec<(&'static str, String)>,
    value: f64,
}

impl MetricSample {
    /// Create an unlabeled sample
    pub fn new(name: &'static str, value: f64) -> Self {
        Self {
            name,
            labels: Vec::new(),
            value,
        }
    }

    /// Create a 0/1 sample from a boolean condition
    pub fn flag(name: &'static str, condition: bool) -> Self {
        Self::new(name, if condition { 1.0 } else { 0.0 })
    }

    /// Append a label, keeping insertion order
    pub fn with_label(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.labels.push((key, value.into()));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn labels(&self) -> &[(&'static str, String)] {
        &self.labels
    }

    /// Look up a label value by key
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Parse a controller-reported number, tolerating surrounding whitespace
///
/// Returns `None` for anything that is not a plain decimal number.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // f64::from_str also accepts "inf" and "NaN", which arcconf never reports
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
