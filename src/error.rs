//! Error types shared by the collectors and the configuration loader

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while collecting controller output
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Failed to start arcconf: {0}")]
    SubprocessSpawn(String),

    #[error("arcconf timed out after {0:?}")]
    Timeout(Duration),

    #[error("arcconf exited with code {code}")]
    SubprocessExit { code: i32, stderr: String },

    #[error("Failed to parse output: {0}")]
    ParseError(String),

    #[error("Malformed XML at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_error_messages() {
        let err = CollectorError::SubprocessExit {
            code: 2,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "arcconf exited with code 2");

        let err = CollectorError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "arcconf timed out after 30s");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: CollectorError = io.into();
        assert!(matches!(err, CollectorError::IoError(_)));
    }
}
