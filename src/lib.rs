//! Prometheus exporter for Adaptec RAID controllers
//!
//! Runs the `arcconf` management utility, parses its human-readable
//! configuration report and its SMART XML output, and writes the resulting
//! measurements in the Prometheus text exposition format.

/// Error types for collection and configuration
pub mod error;

/// Metric samples and metric names
pub mod metrics;

/// Exposition-format writer
pub mod exposition;

/// arcconf runner and output parsers
pub mod collectors;

/// Orchestration of the two collection pipelines
pub mod exporter;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use error::{CollectorError, ConfigError};
pub use exporter::{Exporter, RunSummary};
pub use metrics::MetricSample;
