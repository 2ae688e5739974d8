//! ICMP reachability probe via the system `ping` tool.
//!
//! Spawns exactly one process per probe and bounds it with an explicit
//! timeout so a pass never depends on the tool's own defaults.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::time::timeout;

use super::dialect::Dialect;
use super::traits::{DEFAULT_TIMEOUT, ProbeError, ProbeMetrics, Prober};

/// Default program name for the system ping tool.
pub const DEFAULT_PROGRAM: &str = "ping";

/// Probe that shells out to the platform `ping` command.
#[derive(Debug, Clone)]
pub struct PingProber {
    program: String,
    dialect: Dialect,
    timeout: Duration,
}

impl PingProber {
    /// Create a prober for the detected platform dialect.
    pub fn new() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            dialect: Dialect::detect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the output dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Override the ping program (path or name on `PATH`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Output dialect in use.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Probe timeout in use.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for PingProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Prober for PingProber {
    async fn probe(&self, host: &str) -> Result<ProbeMetrics, ProbeError> {
        // A leading '-' would be read by ping as an option.
        if host.trim().is_empty() || host.starts_with('-') {
            return Err(ProbeError::InvalidHost(host.to_string()));
        }

        let mut command = Command::new(&self.program);
        command
            .args(self.dialect.command_args(host))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))??;

        tracing::trace!(
            host = %host,
            elapsed_ms = start.elapsed().as_millis() as u64,
            status = ?output.status.code(),
            "Ping process finished"
        );

        if !output.status.success() {
            return Err(ProbeError::ExitStatus(output.status.code()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        self.dialect.parse(&stdout)
    }
}
