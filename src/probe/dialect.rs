//! Platform-specific ping output dialects.
//!
//! Parsing is kept apart from process spawning so each dialect can be
//! checked against captured tool output.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use super::traits::{ProbeError, ProbeMetrics};

/// Output dialect of the system `ping` tool.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Dialect {
    /// iputils, BSD/macOS and BusyBox ping: `time=14.2 ms`, explicit loss summary.
    Unix,
    /// Windows ping: `Average = 14ms`, no per-attempt loss figure.
    Windows,
}

impl Dialect {
    /// Select the dialect of the platform this binary was built for.
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    /// Arguments for a single-attempt ping of `host`.
    pub fn command_args(self, host: &str) -> Vec<String> {
        let count_flag = match self {
            Self::Unix => "-c",
            Self::Windows => "-n",
        };
        vec![count_flag.to_string(), "1".to_string(), host.to_string()]
    }

    /// Extract metrics from the tool's standard output.
    ///
    /// Latency is required. Packet loss is only reported when the output
    /// states it unambiguously; any other shape leaves it absent.
    pub fn parse(self, output: &str) -> Result<ProbeMetrics, ProbeError> {
        match self {
            Self::Unix => parse_unix(output),
            Self::Windows => parse_windows(output),
        }
    }
}

fn unix_latency_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"time[=<]\s*([0-9]+(?:\.[0-9]+)?)\s*ms").expect("failed to compile latency regex")
    })
}

fn unix_loss_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([0-9]+(?:\.[0-9]+)?)%\s+packet loss\s*$")
            .expect("failed to compile packet loss regex")
    })
}

fn windows_average_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Average\s*=\s*([0-9]+(?:\.[0-9]+)?)\s*ms")
            .expect("failed to compile average regex")
    })
}

fn parse_unix(output: &str) -> Result<ProbeMetrics, ProbeError> {
    let latency_ms = capture_f64(unix_latency_regex(), output)
        .ok_or_else(|| ProbeError::MalformedOutput("no 'time=' field".to_string()))?;

    let mut metrics = ProbeMetrics::new(latency_ms);
    if let Some(loss) = unix_packet_loss(output) {
        metrics = metrics.with_packet_loss(loss);
    }
    Ok(metrics)
}

/// Packet loss from the comma-delimited summary line, e.g.
/// `1 packets transmitted, 1 received, 0% packet loss, time 0ms`.
fn unix_packet_loss(output: &str) -> Option<f64> {
    let summary = output.lines().find(|line| line.contains("packet loss"))?;
    let mut found = summary
        .split(',')
        .filter_map(|segment| capture_f64(unix_loss_regex(), segment));

    let loss = found.next()?;
    // Two loss figures on one line is not a shape we understand.
    if found.next().is_some() || !(0.0..=100.0).contains(&loss) {
        return None;
    }
    Some(loss)
}

fn parse_windows(output: &str) -> Result<ProbeMetrics, ProbeError> {
    capture_f64(windows_average_regex(), output)
        .map(ProbeMetrics::new)
        .ok_or_else(|| ProbeError::MalformedOutput("no 'Average =' field".to_string()))
}

fn capture_f64(regex: &Regex, text: &str) -> Option<f64> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}
