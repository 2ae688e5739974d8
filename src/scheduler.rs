//! Monitoring session scheduler.
//!
//! Drives repeated passes over the configured host set. Within a pass hosts
//! are probed strictly one after another, in configured order, and each
//! result is appended to the log before the next probe starts.
//!
//! Timing is best-effort periodic: the interval is slept after a pass
//! completes, so probe time is not subtracted from it.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;
use tokio::time::Instant;

use crate::probe::Prober;
use crate::record::{self, Observation, RecordError};
use crate::storage::{LogWriter, StorageError};

/// Default time between passes (1 second).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Default session length (1 hour).
pub const DEFAULT_DURATION: Duration = Duration::from_secs(3600);

/// Host probed when none is configured.
pub const DEFAULT_HOST: &str = "8.8.8.8";

fn default_hosts() -> Vec<String> {
    vec![DEFAULT_HOST.to_string()]
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_duration() -> Option<Duration> {
    Some(DEFAULT_DURATION)
}

/// Errors that end a monitoring session.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Session configuration is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// An observation could not be built for a host.
    #[error("invalid observation: {0}")]
    Record(#[from] RecordError),

    /// Appending to the log failed.
    #[error("failed to record observation: {0}")]
    Storage(#[from] StorageError),

    /// `run()` was called on a session that already ran.
    #[error("session cannot start from state {0}")]
    InvalidState(SessionState),
}

/// Configuration for one monitoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Hosts to probe, in order (default: `["8.8.8.8"]`).
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,
    /// Sleep between passes (default: 1s).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Total session length; `None` runs until stopped (default: 1h).
    #[serde(default = "default_duration", with = "humantime_serde")]
    pub duration: Option<Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            interval: DEFAULT_INTERVAL,
            duration: Some(DEFAULT_DURATION),
        }
    }
}

impl MonitorConfig {
    /// Create a session configuration for `hosts` with default timing.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the interval between passes.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set a bounded session length.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Run until stopped externally.
    pub fn forever(mut self) -> Self {
        self.duration = None;
        self
    }

    /// Validate the configuration.
    ///
    /// Hosts must be unique, must pass [`record::validate_host`] and must
    /// not start with `-`, which `ping` would read as an option. Interval and
    /// duration must be positive.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.hosts.is_empty() {
            return Err(MonitorError::Config("host set cannot be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for host in &self.hosts {
            record::validate_host(host).map_err(|e| MonitorError::Config(e.to_string()))?;
            if host.starts_with('-') {
                return Err(MonitorError::Config(format!(
                    "host '{host}' cannot start with '-'"
                )));
            }
            if !seen.insert(host) {
                return Err(MonitorError::Config(format!("duplicate host: '{host}'")));
            }
        }

        if self.interval.is_zero() {
            return Err(MonitorError::Config("interval must be positive".to_string()));
        }
        if self.duration.is_some_and(|d| d.is_zero()) {
            return Err(MonitorError::Config("duration must be positive".to_string()));
        }
        Ok(())
    }
}

/// Lifecycle of a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    /// Created, not started.
    Idle,
    /// Passes in progress.
    Running,
    /// Configured duration elapsed.
    Completed,
    /// Stopped by a log write failure.
    Aborted,
}

/// Counters for a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// Completed passes over the host set.
    pub passes: u64,
    /// Observations appended to the log.
    pub observations: u64,
    /// Observations with status Online.
    pub online: u64,
    /// Observations with status Offline.
    pub offline: u64,
    /// Wall time from start to finish.
    pub elapsed: Duration,
    /// Final state.
    pub state: SessionState,
}

impl SessionReport {
    fn new() -> Self {
        Self {
            passes: 0,
            observations: 0,
            online: 0,
            offline: 0,
            elapsed: Duration::ZERO,
            state: SessionState::Running,
        }
    }

    fn record(&mut self, observation: &Observation) {
        self.observations += 1;
        if observation.is_online() {
            self.online += 1;
        } else {
            self.offline += 1;
        }
    }
}

/// Sequential monitoring session over a fixed host set.
///
/// Owns the log writer for its whole lifetime.
pub struct Scheduler<P: Prober> {
    config: MonitorConfig,
    prober: P,
    writer: LogWriter,
    state: SessionState,
}

impl<P: Prober> std::fmt::Debug for Scheduler<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("writer", &self.writer)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<P: Prober> Scheduler<P> {
    /// Create an idle session.
    ///
    /// # Errors
    /// Returns `MonitorError::Config` if the configuration is invalid.
    pub fn new(config: MonitorConfig, prober: P, writer: LogWriter) -> Result<Self, MonitorError> {
        config.validate()?;
        Ok(Self {
            config,
            prober,
            writer,
            state: SessionState::Idle,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// The owned log writer.
    pub fn writer(&self) -> &LogWriter {
        &self.writer
    }

    /// Run passes until the configured duration has elapsed.
    ///
    /// # Errors
    /// - `MonitorError::InvalidState` if the session is not idle
    /// - `MonitorError::Storage` if appending to the log fails; the session
    ///   is then `Aborted` and every line written before stays valid
    pub async fn run(&mut self) -> Result<SessionReport, MonitorError> {
        if self.state != SessionState::Idle {
            return Err(MonitorError::InvalidState(self.state));
        }

        self.state = SessionState::Running;
        tracing::info!(
            hosts = ?self.config.hosts,
            interval = ?self.config.interval,
            duration = ?self.config.duration,
            log = %self.writer.path().display(),
            "Monitoring session started"
        );

        let start = Instant::now();
        let mut report = SessionReport::new();

        loop {
            let remaining = match self.config.duration {
                Some(duration) => match duration.checked_sub(start.elapsed()) {
                    Some(left) if !left.is_zero() => Some(left),
                    _ => break,
                },
                None => None,
            };
            tracing::trace!(pass = report.passes + 1, ?remaining, "Starting pass");

            if let Err(e) = self.run_pass(&mut report).await {
                self.state = SessionState::Aborted;
                tracing::error!(error = %e, passes = report.passes, "Monitoring session aborted");
                return Err(e);
            }
            report.passes += 1;

            // Sleeping past the end of the session would only delay exit.
            let nap = match self.config.duration {
                Some(duration) => self.config.interval.min(duration.saturating_sub(start.elapsed())),
                None => self.config.interval,
            };
            tokio::time::sleep(nap).await;
        }

        self.state = SessionState::Completed;
        report.state = self.state;
        report.elapsed = start.elapsed();

        tracing::info!(
            passes = report.passes,
            observations = report.observations,
            online = report.online,
            offline = report.offline,
            elapsed = ?report.elapsed,
            "Monitoring session completed"
        );
        Ok(report)
    }

    /// Probe every host once, in order, appending each observation.
    async fn run_pass(&mut self, report: &mut SessionReport) -> Result<(), MonitorError> {
        for host in &self.config.hosts {
            let outcome = self.prober.probe(host).await;

            match &outcome {
                Ok(metrics) => tracing::debug!(
                    host = %host,
                    latency_ms = metrics.latency_ms,
                    packet_loss_pct = ?metrics.packet_loss_pct,
                    "Probe successful"
                ),
                Err(e) if e.is_malformed() => {
                    tracing::warn!(host = %host, error = %e, "Unrecognized probe output")
                }
                Err(e) => tracing::debug!(host = %host, error = %e, "Probe failed"),
            }

            let observation = record::normalize(host.as_str(), record::now(), &outcome)?;
            self.writer.append(&observation)?;
            report.record(&observation);

            tracing::info!(
                host = %observation.host(),
                status = %observation.status(),
                latency_ms = ?observation.latency_ms(),
                packet_loss_pct = ?observation.packet_loss_pct(),
                "{observation}"
            );
        }
        Ok(())
    }
}
