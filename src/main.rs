use anyhow::Context;
use arcconf_exporter::collectors::ArcconfRunner;
use arcconf_exporter::config::Config;
use arcconf_exporter::error::ConfigError;
use arcconf_exporter::exporter::Exporter;
use arcconf_exporter::exposition::MetricEmitter;
use clap::Parser;
use log::{debug, error, info, warn};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

/// Command-line arguments for the exporter
#[derive(Parser, Debug)]
#[command(
    name = "arcconf-exporter",
    version,
    about = "Prometheus metrics for Adaptec RAID controllers",
    long_about = "Runs arcconf against controller 1, parses its configuration report and \
                  SMART statistics, and prints the results in the Prometheus text \
                  exposition format on standard output. Suitable for the node_exporter \
                  textfile collector or any scrape wrapper."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Override the arcconf executable path
    #[arg(long, value_name = "PATH")]
    arcconf: Option<PathBuf>,

    /// Override the per-invocation timeout
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Override the metric name prefix (empty string disables it)
    #[arg(long, value_name = "NAME")]
    prefix: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging output (debug level)")]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Apply command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, mut config: Config) -> Result<Config, ConfigError> {
        if let Some(ref path) = self.arcconf {
            config.arcconf.path = path.clone();
        }
        if let Some(timeout) = self.timeout {
            config.arcconf.timeout_seconds = timeout;
        }
        if let Some(ref prefix) = self.prefix {
            config.exposition.prefix = prefix.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Load configuration from file or use defaults
///
/// A missing or invalid file is reported and replaced by the defaults.
fn load_config(config_path: Option<&Path>) -> Config {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path) {
                Ok(config) => config,
                Err(ConfigError::ReadError(e)) => {
                    warn!(
                        "Configuration file not found or unreadable ({}), using defaults",
                        e
                    );
                    Config::default()
                }
                Err(e) => {
                    error!("Configuration error in '{}': {}", path.display(), e);
                    warn!("Using default configuration due to invalid config file");
                    Config::default()
                }
            }
        }
        None => {
            debug!("Using default configuration");
            Config::default()
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    cli.validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid arguments")?;

    let config = cli
        .apply_overrides(load_config(cli.config.as_deref()))
        .context("Invalid command-line override")?;
    debug!("{:?}", config);

    let runner = ArcconfRunner::new(config.arcconf.path.clone(), config.arcconf.timeout());
    let exporter = Exporter::new(runner);

    let stdout = io::stdout();
    let mut emitter = MetricEmitter::new(BufWriter::new(stdout.lock()), &config.exposition.prefix);
    let summary = exporter.run(&mut emitter);

    if !summary.success() {
        warn!(
            "Finished with failures (controller status: {}, SMART: {})",
            if summary.controller_ok { "ok" } else { "failed" },
            if summary.smart_ok { "ok" } else { "failed" },
        );
    }

    Ok(summary.exit_code())
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
