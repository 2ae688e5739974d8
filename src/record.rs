//! Observation record model.
//!
//! One [`Observation`] is one normalized probe result. Its text form is a
//! single log line with fields joined by `" - "`:
//!
//! ```text
//! 2024-05-01 12:00:00 - 8.8.8.8 - Online - Latency: 14.2 ms - Packet Loss: 0%
//! 2024-05-01 12:00:01 - 8.8.8.8 - Offline - Latency: N/A ms - Packet Loss: N/A%
//! ```
//!
//! The older single-host layout without the host field is still accepted
//! when parsing:
//!
//! ```text
//! 2024-05-01 12:00:00 - Online - Latency: 12.3 ms
//! 2024-05-01 12:00:01 - Offline - Latency: N/A
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::probe::{ProbeError, ProbeMetrics};

/// Timestamp layout used in log lines (local time, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator between fields of a log line.
pub const FIELD_SEPARATOR: &str = " - ";

/// Token written in place of an absent numeric value.
pub const ABSENT: &str = "N/A";

/// Host assigned to lines written in the legacy single-host layout.
pub const LEGACY_HOST: &str = "default";

const LATENCY_PREFIX: &str = "Latency:";
const PACKET_LOSS_PREFIX: &str = "Packet Loss:";

/// Errors building an observation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The host would not survive a write and re-read of its log line.
    #[error("invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: &'static str },
}

/// Check that `host` can be written into a log line and read back unchanged.
///
/// A host must be non-empty, carry no leading or trailing whitespace, and
/// must not form the field separator with its neighbours or break the line.
pub fn validate_host(host: &str) -> Result<(), RecordError> {
    let invalid = |reason| {
        Err(RecordError::InvalidHost {
            host: host.to_string(),
            reason,
        })
    };

    if host.is_empty() {
        return invalid("host cannot be empty");
    }
    if host.trim() != host {
        return invalid("leading or trailing whitespace");
    }
    if host.contains(['\n', '\r']) {
        return invalid("contains a line break");
    }
    // Padding catches a separator formed with the surrounding field joins.
    if format!(" {host} ").contains(FIELD_SEPARATOR) {
        return invalid("contains the field separator");
    }
    Ok(())
}

/// Reachability status of one observation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumString, Display, AsRefStr,
)]
pub enum Status {
    /// The host answered and latency was measured.
    Online,
    /// The host did not answer, or the answer could not be read.
    Offline,
}

/// One normalized probe result.
///
/// `status` is `Online` exactly when `latency_ms` is present, and the host
/// passes [`validate_host`]. The constructors and
/// [`Observation::parse_line`] are the only ways to build one, so every
/// observation serializes to a line that parses back to itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    timestamp: NaiveDateTime,
    host: String,
    status: Status,
    latency_ms: Option<f64>,
    packet_loss_pct: Option<f64>,
}

impl Observation {
    /// A successful observation.
    ///
    /// A latency that is negative or not finite cannot have been measured,
    /// so the result is `Offline`. Packet loss outside `[0, 100]` is dropped
    /// rather than stored.
    ///
    /// # Errors
    /// Returns `RecordError::InvalidHost` if `host` fails [`validate_host`].
    pub fn online(
        host: impl Into<String>,
        timestamp: NaiveDateTime,
        latency_ms: f64,
        packet_loss_pct: Option<f64>,
    ) -> Result<Self, RecordError> {
        if !valid_latency(latency_ms) {
            return Self::offline(host, timestamp);
        }

        let host = host.into();
        validate_host(&host)?;
        Ok(Self {
            timestamp: truncate_to_second(timestamp),
            host,
            status: Status::Online,
            latency_ms: Some(latency_ms),
            packet_loss_pct: packet_loss_pct.filter(|p| valid_packet_loss(*p)),
        })
    }

    /// A failed observation with both metrics absent.
    ///
    /// # Errors
    /// Returns `RecordError::InvalidHost` if `host` fails [`validate_host`].
    pub fn offline(host: impl Into<String>, timestamp: NaiveDateTime) -> Result<Self, RecordError> {
        let host = host.into();
        validate_host(&host)?;
        Ok(Self {
            timestamp: truncate_to_second(timestamp),
            host,
            status: Status::Offline,
            latency_ms: None,
            packet_loss_pct: None,
        })
    }

    /// Observation timestamp (local time, whole seconds).
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Probed host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Reachability status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether the host was reachable.
    pub fn is_online(&self) -> bool {
        self.status == Status::Online
    }

    /// Round-trip latency in milliseconds, absent when offline.
    pub fn latency_ms(&self) -> Option<f64> {
        self.latency_ms
    }

    /// Packet loss percentage, absent when not measurable.
    pub fn packet_loss_pct(&self) -> Option<f64> {
        self.packet_loss_pct
    }

    /// Parse one log line, assigning [`LEGACY_HOST`] to legacy lines.
    ///
    /// Returns `None` for anything that is not a complete, well-formed line.
    pub fn parse_line(line: &str) -> Option<Self> {
        Self::parse_line_with_legacy_host(line, LEGACY_HOST)
    }

    /// Parse one log line, assigning `legacy_host` to legacy lines.
    pub fn parse_line_with_legacy_host(line: &str, legacy_host: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

        let (timestamp, host, status, latency, packet_loss) = match fields.as_slice() {
            [ts, host, status, latency, loss] => {
                (*ts, host.trim(), *status, parse_latency(latency)?, parse_packet_loss(loss)?)
            }
            [ts, status, latency] => (*ts, legacy_host, *status, parse_latency(latency)?, None),
            _ => return None,
        };

        let timestamp = NaiveDateTime::parse_from_str(timestamp.trim(), TIMESTAMP_FORMAT).ok()?;
        let status = Status::from_str(status.trim()).ok()?;
        if validate_host(host).is_err() || (status == Status::Online) != latency.is_some() {
            return None;
        }

        Some(Self {
            timestamp,
            host: host.to_string(),
            status,
            latency_ms: latency,
            packet_loss_pct: packet_loss,
        })
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ts}{sep}{host}{sep}{status}{sep}{LATENCY_PREFIX} {latency} ms{sep}{PACKET_LOSS_PREFIX} {loss}%",
            ts = self.timestamp.format(TIMESTAMP_FORMAT),
            sep = FIELD_SEPARATOR,
            host = self.host,
            status = self.status,
            latency = OptionalValue(self.latency_ms),
            loss = OptionalValue(self.packet_loss_pct),
        )
    }
}

/// Build an observation from a probe outcome.
///
/// Success becomes `Online` with the measured metrics. Any error, or a
/// latency that is not a non-negative finite number, becomes `Offline` with
/// both metrics absent.
///
/// # Errors
/// Returns `RecordError::InvalidHost` if `host` fails [`validate_host`].
pub fn normalize(
    host: impl Into<String>,
    timestamp: NaiveDateTime,
    outcome: &Result<ProbeMetrics, ProbeError>,
) -> Result<Observation, RecordError> {
    match outcome {
        Ok(metrics) => {
            Observation::online(host, timestamp, metrics.latency_ms, metrics.packet_loss_pct)
        }
        Err(_) => Observation::offline(host, timestamp),
    }
}

/// Current local time at second precision.
pub fn now() -> NaiveDateTime {
    truncate_to_second(Local::now().naive_local())
}

struct OptionalValue(Option<f64>);

impl fmt::Display for OptionalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str(ABSENT),
        }
    }
}

fn truncate_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

fn valid_latency(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn valid_packet_loss(v: f64) -> bool {
    v.is_finite() && (0.0..=100.0).contains(&v)
}

/// `Latency: 14.2 ms`, `Latency: N/A ms` or legacy `Latency: N/A`.
///
/// Outer `None` means malformed, inner `None` means absent.
fn parse_latency(field: &str) -> Option<Option<f64>> {
    let value = field.trim().strip_prefix(LATENCY_PREFIX)?.trim();
    if value == ABSENT {
        return Some(None);
    }
    // A missing unit means the line was cut short.
    let value = value.strip_suffix("ms")?.trim();
    if value == ABSENT {
        return Some(None);
    }
    let v = value.parse::<f64>().ok().filter(|v| valid_latency(*v))?;
    Some(Some(v))
}

/// `Packet Loss: 0%` or `Packet Loss: N/A%`.
fn parse_packet_loss(field: &str) -> Option<Option<f64>> {
    let value = field
        .trim()
        .strip_prefix(PACKET_LOSS_PREFIX)?
        .trim()
        .strip_suffix('%')?
        .trim();
    if value == ABSENT {
        return Some(None);
    }
    let v = value.parse::<f64>().ok().filter(|v| valid_packet_loss(*v))?;
    Some(Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    #[test]
    fn test_display_online() {
        let obs = Observation::online("8.8.8.8", ts(12, 0, 0), 14.2, Some(0.0)).unwrap();
        assert_eq!(
            obs.to_string(),
            "2024-05-01 12:00:00 - 8.8.8.8 - Online - Latency: 14.2 ms - Packet Loss: 0%"
        );
    }

    #[test]
    fn test_display_offline() {
        let obs = Observation::offline("1.1.1.1", ts(12, 0, 1)).unwrap();
        assert_eq!(
            obs.to_string(),
            "2024-05-01 12:00:01 - 1.1.1.1 - Offline - Latency: N/A ms - Packet Loss: N/A%"
        );
    }

    #[test]
    fn test_timestamp_truncated_to_second() {
        let precise = ts(8, 30, 15).with_nanosecond(987_654_321).unwrap();
        let obs = Observation::offline("h", precise).unwrap();
        assert_eq!(obs.timestamp(), ts(8, 30, 15));
    }

    // =========================================================================
    // Round trip
    // =========================================================================

    #[test]
    fn test_round_trip_present_and_absent_fields() {
        let cases = [
            Observation::online("8.8.8.8", ts(1, 2, 3), 14.2, Some(0.0)).unwrap(),
            Observation::online("example.com", ts(1, 2, 4), 0.06, None).unwrap(),
            Observation::online("10.0.0.1", ts(1, 2, 5), 120.0, Some(33.3)).unwrap(),
            Observation::offline("8.8.4.4", ts(1, 2, 6)).unwrap(),
        ];

        for obs in cases {
            let line = obs.to_string();
            assert_eq!(Observation::parse_line(&line), Some(obs), "line: {line}");
        }
    }

    #[test]
    fn test_parse_tolerates_line_terminators() {
        let line = "2024-05-01 12:00:00 - h - Online - Latency: 5 ms - Packet Loss: 0%\r\n";
        let obs = Observation::parse_line(line).unwrap();
        assert_eq!(obs.latency_ms(), Some(5.0));
    }

    // =========================================================================
    // Absence tokens
    // =========================================================================

    #[test]
    fn test_na_parses_to_absence_not_zero() {
        let line = "2024-05-01 12:00:00 - h - Online - Latency: 7.5 ms - Packet Loss: N/A%";
        let obs = Observation::parse_line(line).unwrap();
        assert_eq!(obs.packet_loss_pct(), None);

        let line = "2024-05-01 12:00:00 - h - Offline - Latency: N/A ms - Packet Loss: N/A%";
        let obs = Observation::parse_line(line).unwrap();
        assert_eq!(obs.latency_ms(), None);
        assert_eq!(obs.packet_loss_pct(), None);
    }

    // =========================================================================
    // Legacy layout
    // =========================================================================

    #[test]
    fn test_parse_legacy_online() {
        let obs = Observation::parse_line("2024-05-01 12:00:00 - Online - Latency: 12.3 ms").unwrap();
        assert_eq!(obs.host(), LEGACY_HOST);
        assert_eq!(obs.status(), Status::Online);
        assert_eq!(obs.latency_ms(), Some(12.3));
        assert_eq!(obs.packet_loss_pct(), None);
    }

    #[test]
    fn test_parse_legacy_offline() {
        let obs = Observation::parse_line("2024-05-01 12:00:00 - Offline - Latency: N/A").unwrap();
        assert_eq!(obs.status(), Status::Offline);
        assert_eq!(obs.latency_ms(), None);
    }

    #[test]
    fn test_parse_legacy_custom_host() {
        let obs = Observation::parse_line_with_legacy_host(
            "2024-05-01 12:00:00 - Online - Latency: 1 ms",
            "8.8.8.8",
        )
        .unwrap();
        assert_eq!(obs.host(), "8.8.8.8");
    }

    // =========================================================================
    // Malformed input
    // =========================================================================

    #[test]
    fn test_parse_rejects_malformed_lines() {
        let bad = [
            "",
            "garbage",
            "2024-05-01 12:00:00 - h - Online - Latency: 1",
            "2024-05-01 12:00:00 - h - Online - Latency: 1 ms - Packet Loss: 1",
            "2024-05-01 12:00:00 - h - Online - Latency: 1 ms - Packet Loss: 120%",
            "2024-05-01 12:00:00 - h - Online - Latency: -3 ms - Packet Loss: 0%",
            "2024-05-01 12:00:00 - h - Online - Latency: abc ms - Packet Loss: 0%",
            "2024-05-01 12:00:00 - h - Maybe - Latency: 1 ms - Packet Loss: 0%",
            "2024-05-01 12:00 - h - Online - Latency: 1 ms - Packet Loss: 0%",
            "2024-05-01 12:00:00 -  - Online - Latency: 1 ms - Packet Loss: 0%",
            "2024-05-01 12:00:00 - Online - Latency: 12.3 m",
        ];
        for line in bad {
            assert_eq!(Observation::parse_line(line), None, "line: {line:?}");
        }
    }

    #[test]
    fn test_parse_rejects_status_latency_mismatch() {
        let online_without_latency =
            "2024-05-01 12:00:00 - h - Online - Latency: N/A ms - Packet Loss: N/A%";
        let offline_with_latency =
            "2024-05-01 12:00:00 - h - Offline - Latency: 9 ms - Packet Loss: N/A%";
        assert_eq!(Observation::parse_line(online_without_latency), None);
        assert_eq!(Observation::parse_line(offline_with_latency), None);
    }

    // =========================================================================
    // Normalization
    // =========================================================================

    #[test]
    fn test_normalize_success() {
        let outcome = Ok(ProbeMetrics::new(14.2).with_packet_loss(0.0));
        let obs = normalize("8.8.8.8", ts(0, 0, 0), &outcome).unwrap();
        assert!(obs.is_online());
        assert_eq!(obs.latency_ms(), Some(14.2));
        assert_eq!(obs.packet_loss_pct(), Some(0.0));
    }

    #[test]
    fn test_normalize_failure_drops_metrics() {
        let outcome = Err(ProbeError::ExitStatus(Some(1)));
        let obs = normalize("8.8.8.8", ts(0, 0, 0), &outcome).unwrap();
        assert_eq!(obs.status(), Status::Offline);
        assert_eq!(obs.latency_ms(), None);
        assert_eq!(obs.packet_loss_pct(), None);
    }

    #[test]
    fn test_normalize_invalid_latency_is_offline() {
        let outcome = Ok(ProbeMetrics::new(f64::NAN));
        let obs = normalize("h", ts(0, 0, 0), &outcome).unwrap();
        assert_eq!(obs.status(), Status::Offline);
    }

    #[test]
    fn test_online_iff_latency_present() {
        let observations = [
            normalize("a", ts(0, 0, 0), &Ok(ProbeMetrics::new(1.0))).unwrap(),
            normalize("b", ts(0, 0, 0), &Err(ProbeError::Timeout(Duration::from_secs(1)))).unwrap(),
            Observation::offline("c", ts(0, 0, 0)).unwrap(),
            Observation::online("d", ts(0, 0, 0), 0.0, None).unwrap(),
        ];
        for obs in observations {
            assert_eq!(obs.is_online(), obs.latency_ms().is_some());
        }
    }

    #[test]
    fn test_online_drops_out_of_range_loss() {
        let obs = Observation::online("h", ts(0, 0, 0), 1.0, Some(150.0)).unwrap();
        assert_eq!(obs.packet_loss_pct(), None);
    }

    #[test]
    fn test_online_with_unmeasurable_latency_is_offline() {
        for latency in [-5.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let obs = Observation::online("h", ts(0, 0, 0), latency, Some(0.0)).unwrap();
            assert_eq!(obs.status(), Status::Offline, "latency: {latency}");
            assert_eq!(obs.latency_ms(), None);
            assert_eq!(obs.packet_loss_pct(), None);

            let line = obs.to_string();
            assert_eq!(Observation::parse_line(&line), Some(obs), "line: {line}");
        }
    }

    // =========================================================================
    // Host constraints
    // =========================================================================

    #[test]
    fn test_validate_host_accepts_usual_hosts() {
        for host in ["8.8.8.8", "example.com", "::1", "fe80::1%eth0", "a-b", "-x"] {
            assert!(validate_host(host).is_ok(), "host: {host:?}");
        }
    }

    #[test]
    fn test_hosts_that_would_not_round_trip_are_rejected() {
        let bad = ["", " ", "h ", " h", "a - b", "a -", "- a", "a\nb", "a\rb"];
        for host in bad {
            assert!(validate_host(host).is_err(), "host: {host:?}");
            assert!(
                matches!(
                    Observation::offline(host, ts(0, 0, 0)),
                    Err(RecordError::InvalidHost { .. })
                ),
                "host: {host:?}"
            );
            assert!(Observation::online(host, ts(0, 0, 0), 1.0, None).is_err());
            assert!(normalize(host, ts(0, 0, 0), &Ok(ProbeMetrics::new(1.0))).is_err());
        }
    }

    #[test]
    fn test_every_constructed_observation_round_trips() {
        let outcomes = [
            Ok(ProbeMetrics::new(3.5).with_packet_loss(0.0)),
            Ok(ProbeMetrics::new(-1.0)),
            Err(ProbeError::ExitStatus(None)),
        ];
        for host in ["8.8.8.8", "a-b", "-x", "host.example"] {
            for outcome in &outcomes {
                let obs = normalize(host, ts(0, 0, 0), outcome).unwrap();
                let line = obs.to_string();
                assert_eq!(Observation::parse_line(&line), Some(obs), "line: {line}");
            }
        }
    }

    #[test]
    fn test_parse_rejects_invalid_legacy_host() {
        let line = "2024-05-01 12:00:00 - Online - Latency: 1 ms";
        assert_eq!(Observation::parse_line_with_legacy_host(line, ""), None);
        assert_eq!(Observation::parse_line_with_legacy_host(line, "a - b"), None);
    }

    #[test]
    fn test_status_tokens() {
        assert_eq!(Status::Online.as_ref(), "Online");
        assert_eq!(Status::from_str("Offline").unwrap(), Status::Offline);
        assert!(Status::from_str("online").is_err());
    }
}
