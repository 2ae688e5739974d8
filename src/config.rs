//! Configuration module for connwatch.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Monitoring session settings (hosts, interval, duration)
//! - Probe settings (timeout, program, dialect)
//! - Log file settings (path, append, sync)

mod app;
mod validation;

pub use app::{AppConfig, LogConfig, ProbeConfig};
pub use validation::{ConfigError, expand_env_vars, parse_duration, parse_session_duration};

// Re-export constants
pub use app::DEFAULT_LOG_PATH;
pub use validation::FOREVER;
