//! Application configuration structures.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::probe::{DEFAULT_PROGRAM, DEFAULT_TIMEOUT, Dialect, MAX_TIMEOUT, PingProber};
use crate::scheduler::MonitorConfig;
use crate::storage::OpenMode;

use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default log file path.
pub const DEFAULT_LOG_PATH: &str = "internet_connectivity_log.txt";

// =============================================================================
// Probe Configuration
// =============================================================================

/// Probe process configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Upper bound on one probe (default: 3s, maximum: 60s).
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Ping program name or path (default: "ping").
    pub program: String,

    /// Output dialect; detected from the platform when unset.
    pub dialect: Option<Dialect>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            program: DEFAULT_PROGRAM.to_string(),
            dialect: None,
        }
    }
}

impl ProbeConfig {
    /// Build the prober described by this configuration.
    pub fn build_prober(&self) -> PingProber {
        PingProber::new()
            .with_program(&self.program)
            .with_timeout(self.timeout)
            .with_dialect(self.dialect.unwrap_or_else(Dialect::detect))
    }
}

// =============================================================================
// Log Configuration
// =============================================================================

/// Log file configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log file path; `${VAR}` and `${VAR:-default}` are expanded.
    pub path: String,

    /// Keep previous content instead of starting a fresh log (default: false).
    pub append: bool,

    /// `fsync` after every line (default: false).
    pub sync: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_LOG_PATH.to_string(),
            append: false,
            sync: false,
        }
    }
}

impl LogConfig {
    /// Log path with environment variables expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(expand_env_vars(&self.path))
    }

    /// Open mode for the session log.
    pub fn open_mode(&self) -> OpenMode {
        if self.append {
            OpenMode::Append
        } else {
            OpenMode::Truncate
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
///
/// Every section is optional; missing sections use defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Monitoring session settings.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Probe settings.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Log file settings.
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitor
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("monitor: {e}")))?;

        // Validate probe timeout
        if self.probe.timeout.is_zero() || self.probe.timeout > MAX_TIMEOUT {
            return Err(ConfigError::ValidationError(format!(
                "probe timeout must be within (0, {}]",
                humantime::format_duration(MAX_TIMEOUT)
            )));
        }

        if self.probe.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "probe program cannot be empty".to_string(),
            ));
        }

        if self.log.resolved_path().as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "log path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
