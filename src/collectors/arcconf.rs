//! Runs arcconf as a subprocess
//!
//! One invocation is bounded by a single deadline covering the child's exit
//! and the end of its output streams.

use crate::error::CollectorError;
use log::{debug, warn};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Controller unit queried by every command
pub const CONTROLLER_UNIT: &str = "1";

/// How often a running child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// arcconf sub-commands used by the exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcconfCommand {
    /// `getconfig`: human-readable controller, array and battery report
    GetConfig,
    /// `getsmartstats`: SMART attributes as XML fragments
    GetSmartStats,
}

impl ArcconfCommand {
    pub fn verb(self) -> &'static str {
        match self {
            ArcconfCommand::GetConfig => "getconfig",
            ArcconfCommand::GetSmartStats => "getsmartstats",
        }
    }

    pub fn args(self) -> [&'static str; 2] {
        [self.verb(), CONTROLLER_UNIT]
    }
}

/// Source of raw controller output
///
/// Implemented by [`ArcconfRunner`] for real hardware; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
pub trait OutputSource {
    /// Run `command` and return its captured standard output
    fn fetch(&self, command: ArcconfCommand) -> Result<String, CollectorError>;
}

/// Runs the arcconf executable with a bounded wait
pub struct ArcconfRunner {
    /// Path to the arcconf binary
    path: PathBuf,
    /// Maximum time a single invocation may take
    timeout: Duration,
}

impl ArcconfRunner {
    /// Create a runner for the executable at `path`
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::time::Duration;
    /// use arcconf_exporter::collectors::{ArcconfCommand, ArcconfRunner, OutputSource};
    ///
    /// let runner = ArcconfRunner::new("/usr/local/bin/arcconf", Duration::from_secs(30));
    /// let report = runner.fetch(ArcconfCommand::GetConfig);
    /// ```
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn spawn(&self, command: ArcconfCommand) -> Result<Child, CollectorError> {
        debug!(
            "Spawning {} {}",
            self.path.display(),
            command.args().join(" ")
        );

        Command::new(&self.path)
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CollectorError::SubprocessSpawn(format!("{}: {}", self.path.display(), e))
            })
    }

    /// Wait for the child to exit, killing it once `deadline` passes
    fn wait_until(
        &self,
        child: &mut Child,
        deadline: Instant,
    ) -> Result<ExitStatus, CollectorError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        if let Err(e) = child.kill() {
                            warn!("Failed to kill arcconf: {}", e);
                        }
                        let _ = child.wait();
                        return Err(CollectorError::Timeout(self.timeout));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CollectorError::IoError(e));
                }
            }
        }
    }

    /// Receive a drained pipe, giving up once `deadline` passes
    fn collect(&self, drain: Drain, deadline: Instant) -> Result<Vec<u8>, CollectorError> {
        let Some(receiver) = drain else {
            return Ok(Vec::new());
        };

        match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(result) => result.map_err(CollectorError::IoError),
            Err(RecvTimeoutError::Timeout) => {
                warn!("arcconf output still open after {:?}", self.timeout);
                Err(CollectorError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(CollectorError::ParseError(
                "output reader thread ended without a result".to_string(),
            )),
        }
    }
}

impl OutputSource for ArcconfRunner {
    fn fetch(&self, command: ArcconfCommand) -> Result<String, CollectorError> {
        let deadline = Instant::now() + self.timeout;
        let mut child = self.spawn(command)?;

        // Drain both pipes while waiting so a chatty child cannot block on write
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait_until(&mut child, deadline)?;

        // A background process left behind by arcconf may still hold the pipes
        let stdout = self.collect(stdout, deadline)?;
        let stderr = self.collect(stderr, deadline).unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            if !stderr.is_empty() {
                debug!("arcconf stderr: {}", stderr);
            }
            return Err(CollectorError::SubprocessExit {
                code: status.code().unwrap_or(-1),
                stderr,
            });
        }

        debug!(
            "arcconf {} returned {} bytes",
            command.verb(),
            stdout.len()
        );
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

type Drain = Option<Receiver<std::io::Result<Vec<u8>>>>;

/// Read a pipe to EOF on a helper thread
///
/// The thread is never joined; it ends when the last writer closes the pipe.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut pipe| {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let result = pipe.read_to_end(&mut buffer).map(|_| buffer);
            // The receiver is gone when the deadline already passed
            let _ = sender.send(result);
        });
        receiver
    })
}
