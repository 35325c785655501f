/// arcconf subprocess runner and the output source seam
pub mod arcconf;

/// Section-aware parser for the `getconfig` report
pub mod config_report;

/// XML walker for `getsmartstats` output
pub mod smart_stats;

pub use arcconf::{ArcconfCommand, ArcconfRunner, OutputSource};
pub use config_report::parse_config_report;
pub use smart_stats::{parse_smart_stats, SmartStatsReport};
