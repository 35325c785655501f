//! Runs both collection pipelines and writes their samples
//!
//! The controller-status pipeline and the SMART pipeline are independent: a
//! failure in one never prevents the other from running. Their outcomes are
//! folded into a process exit code.

use crate::collectors::{
    parse_config_report, parse_smart_stats, ArcconfCommand, OutputSource,
};
use crate::error::CollectorError;
use crate::exposition::MetricEmitter;
use crate::metrics::{MetricSample, RAID_IS_OPTIMAL};
use log::{error, info, warn};
use std::io::Write;

/// Exit code bit set when the controller-status pipeline fails
pub const CONTROLLER_FAILURE: i32 = 1;
/// Exit code bit set when the SMART pipeline fails
pub const SMART_FAILURE: i32 = 2;

/// Outcome of one exporter run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub controller_ok: bool,
    pub smart_ok: bool,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.controller_ok && self.smart_ok
    }

    /// Bitwise OR of the failure bits; zero when both pipelines succeeded
    pub fn exit_code(&self) -> i32 {
        let mut code = 0;
        if !self.controller_ok {
            code |= CONTROLLER_FAILURE;
        }
        if !self.smart_ok {
            code |= SMART_FAILURE;
        }
        code
    }
}

/// Drives the output source, the parsers and the emitter
pub struct Exporter<S: OutputSource> {
    source: S,
}

impl<S: OutputSource> Exporter<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Run the controller-status pipeline, then the SMART pipeline
    pub fn run<W: Write>(&self, emitter: &mut MetricEmitter<W>) -> RunSummary {
        let controller_ok = match self.export_controller_status(emitter) {
            Ok(count) => {
                info!("Exported {} controller status samples", count);
                true
            }
            Err(e) => {
                error!("Failed to export controller status: {}", e);
                false
            }
        };

        let smart_ok = match self.export_smart_stats(emitter) {
            Ok(count) => {
                info!("Exported {} SMART attribute samples", count);
                true
            }
            Err(e) => {
                error!("Failed to export SMART attributes: {}", e);
                false
            }
        };

        if let Err(e) = emitter.flush() {
            error!("Failed to flush metrics output: {}", e);
            return RunSummary {
                controller_ok: false,
                smart_ok: false,
            };
        }

        RunSummary {
            controller_ok,
            smart_ok,
        }
    }

    /// Export controller, logical device and battery status
    ///
    /// When the report cannot be obtained, `raid_is_optimal 0` is still
    /// written so the key health metric is never absent.
    pub fn export_controller_status<W: Write>(
        &self,
        emitter: &mut MetricEmitter<W>,
    ) -> Result<usize, CollectorError> {
        let report = match self.source.fetch(ArcconfCommand::GetConfig) {
            Ok(report) => report,
            Err(e) => {
                let fallback = MetricSample::flag(RAID_IS_OPTIMAL, false);
                if let Err(write_error) = emitter.emit(&fallback) {
                    error!("Failed to write fallback controller status: {}", write_error);
                }
                return Err(e);
            }
        };

        let samples = parse_config_report(&report);
        if !samples.iter().any(|s| s.name() == RAID_IS_OPTIMAL) {
            warn!("arcconf getconfig output did not contain a controller status");
        }

        emitter.emit_all(&samples)?;
        Ok(samples.len())
    }

    /// Export SMART attributes for every physical drive
    ///
    /// Samples from well-formed fragments are written even when a later
    /// fragment is malformed; the pipeline still reports failure then.
    pub fn export_smart_stats<W: Write>(
        &self,
        emitter: &mut MetricEmitter<W>,
    ) -> Result<usize, CollectorError> {
        let output = self.source.fetch(ArcconfCommand::GetSmartStats)?;

        let report = parse_smart_stats(&output);
        info!(
            "Read SMART data for {} drives ({} attributes)",
            report.drives,
            report.samples.len()
        );

        emitter.emit_all(&report.samples)?;
        match report.error {
            Some(e) => Err(e),
            None => Ok(report.samples.len()),
        }
    }
}
