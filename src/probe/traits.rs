//! Core prober traits and types.

use std::time::Duration;

use thiserror::Error;

/// Default probe timeout (3 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Upper bound accepted for a probe timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur during a single probe.
///
/// Every variant means the host is treated as unreachable for that probe.
/// None of them escalate past "record as Offline".
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Host identifier was empty or would be read as a ping option.
    #[error("invalid host: '{0}'")]
    InvalidHost(String),

    /// The ping process could not be launched.
    #[error("failed to spawn ping: {0}")]
    Spawn(#[from] std::io::Error),

    /// The ping process did not finish within the timeout.
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    /// The ping process exited with a non-zero status.
    #[error("ping exited with status {0:?}")]
    ExitStatus(Option<i32>),

    /// The process succeeded but its output did not match the dialect.
    #[error("malformed ping output: {0}")]
    MalformedOutput(String),
}

impl ProbeError {
    /// Whether the error reflects an unexpected output shape rather than
    /// plain unreachability.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedOutput(_))
    }
}

/// Metrics extracted from one successful probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeMetrics {
    /// Round-trip latency in milliseconds.
    pub latency_ms: f64,
    /// Packet loss percentage, when the dialect can report it.
    pub packet_loss_pct: Option<f64>,
}

impl ProbeMetrics {
    /// Create metrics with latency only.
    pub fn new(latency_ms: f64) -> Self {
        Self {
            latency_ms,
            packet_loss_pct: None,
        }
    }

    /// Set packet loss percentage.
    pub fn with_packet_loss(mut self, pct: f64) -> Self {
        self.packet_loss_pct = Some(pct);
        self
    }
}

/// Reachability check against a single host.
///
/// # Error Handling Philosophy
///
/// `probe()` returns `Err(ProbeError)` for every way a host can fail to
/// answer. Callers never propagate these errors; they are normalized into
/// an Offline observation. Implementations must bound their own execution
/// time so a pass always makes progress.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Run exactly one reachability attempt against `host`.
    async fn probe(&self, host: &str) -> Result<ProbeMetrics, ProbeError>;
}

#[async_trait::async_trait]
impl<P: Prober + ?Sized> Prober for std::sync::Arc<P> {
    async fn probe(&self, host: &str) -> Result<ProbeMetrics, ProbeError> {
        (**self).probe(host).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_metrics_builder() {
        let metrics = ProbeMetrics::new(12.5).with_packet_loss(0.0);
        assert_eq!(metrics.latency_ms, 12.5);
        assert_eq!(metrics.packet_loss_pct, Some(0.0));
    }

    #[test]
    fn test_probe_metrics_default_loss_absent() {
        assert_eq!(ProbeMetrics::new(1.0).packet_loss_pct, None);
    }

    #[test]
    fn test_probe_error_display() {
        let err = ProbeError::Timeout(Duration::from_secs(3));
        assert!(err.to_string().contains("timed out"));

        let err = ProbeError::ExitStatus(Some(1));
        assert!(err.to_string().contains("Some(1)"));
    }

    #[test]
    fn test_probe_error_is_malformed() {
        assert!(ProbeError::MalformedOutput("x".into()).is_malformed());
        assert!(!ProbeError::Timeout(DEFAULT_TIMEOUT).is_malformed());
    }
}
