//! Offline analysis over parsed observations.
//!
//! Reductions skip absent values. A reduction with nothing to reduce is
//! `None` ("unavailable"), never NaN.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::record::{ABSENT, Observation, TIMESTAMP_FORMAT};
use crate::storage::{HostObservations, ReadStats, group_by_host};

/// Aggregate figures over a sequence of observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    /// Number of observations.
    pub total: usize,
    /// Observations with status Online.
    pub online: usize,
    /// Observations with status Offline.
    pub offline: usize,
    /// Share of Online observations, in percent.
    pub uptime_pct: Option<f64>,
    /// Mean latency over observations that have one.
    pub avg_latency_ms: Option<f64>,
    /// Smallest latency seen.
    pub min_latency_ms: Option<f64>,
    /// Largest latency seen.
    pub max_latency_ms: Option<f64>,
    /// Largest packet loss seen.
    pub max_packet_loss_pct: Option<f64>,
    /// Earliest timestamp.
    pub first: Option<NaiveDateTime>,
    /// Latest timestamp.
    pub last: Option<NaiveDateTime>,
}

impl Summary {
    /// Summarize `observations`.
    pub fn from_observations<'a>(observations: impl IntoIterator<Item = &'a Observation>) -> Self {
        let mut summary = Self::default();
        let mut latency_sum = 0.0;
        let mut latency_count = 0usize;

        for obs in observations {
            summary.total += 1;
            if obs.is_online() {
                summary.online += 1;
            } else {
                summary.offline += 1;
            }

            if let Some(latency) = obs.latency_ms() {
                latency_sum += latency;
                latency_count += 1;
                summary.min_latency_ms = Some(summary.min_latency_ms.map_or(latency, |m| m.min(latency)));
                summary.max_latency_ms = Some(summary.max_latency_ms.map_or(latency, |m| m.max(latency)));
            }
            if let Some(loss) = obs.packet_loss_pct() {
                summary.max_packet_loss_pct =
                    Some(summary.max_packet_loss_pct.map_or(loss, |m| m.max(loss)));
            }

            let ts = obs.timestamp();
            summary.first = Some(summary.first.map_or(ts, |f| f.min(ts)));
            summary.last = Some(summary.last.map_or(ts, |l| l.max(ts)));
        }

        if summary.total > 0 {
            summary.uptime_pct = Some(summary.online as f64 * 100.0 / summary.total as f64);
        }
        if latency_count > 0 {
            summary.avg_latency_ms = Some(latency_sum / latency_count as f64);
        }
        summary
    }

    /// Whether there was nothing to summarize.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total entries: {}", self.total)?;
        writeln!(f, "Online entries: {}", self.online)?;
        writeln!(f, "Offline entries: {}", self.offline)?;
        writeln!(f, "Uptime: {}%", Fixed2(self.uptime_pct))?;
        writeln!(f, "Average latency: {} ms", Fixed2(self.avg_latency_ms))?;
        writeln!(f, "Min latency: {} ms", Plain(self.min_latency_ms))?;
        writeln!(f, "Max latency: {} ms", Plain(self.max_latency_ms))?;
        write!(f, "Max packet loss: {}%", Plain(self.max_packet_loss_pct))?;
        if let (Some(first), Some(last)) = (self.first, self.last) {
            write!(
                f,
                "\nTime range: {} .. {}",
                first.format(TIMESTAMP_FORMAT),
                last.format(TIMESTAMP_FORMAT)
            )?;
        }
        Ok(())
    }
}

struct Fixed2(Option<f64>);

impl fmt::Display for Fixed2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.2}"),
            None => f.write_str(ABSENT),
        }
    }
}

struct Plain(Option<f64>);

impl fmt::Display for Plain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str(ABSENT),
        }
    }
}

/// Summaries keyed by host.
pub fn summarize_by_host(grouped: &HostObservations) -> BTreeMap<String, Summary> {
    grouped
        .iter()
        .map(|(host, observations)| (host.clone(), Summary::from_observations(observations)))
        .collect()
}

/// A maximal run of consecutive Offline observations for one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outage {
    /// Host that was unreachable.
    pub host: String,
    /// Timestamp of the first Offline observation in the run.
    pub start: NaiveDateTime,
    /// Timestamp of the last Offline observation in the run.
    pub end: NaiveDateTime,
    /// Number of Offline observations in the run.
    pub samples: usize,
}

impl fmt::Display for Outage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} .. {} ({} samples)",
            self.host,
            self.start.format(TIMESTAMP_FORMAT),
            self.end.format(TIMESTAMP_FORMAT),
            self.samples
        )
    }
}

/// Find outage windows, ordered by start time.
///
/// Runs are tracked per host, so interleaved hosts do not split each
/// other's outages. A run still open at the end of the input is included.
pub fn outages<'a>(observations: impl IntoIterator<Item = &'a Observation>) -> Vec<Outage> {
    let mut open: BTreeMap<&str, Outage> = BTreeMap::new();
    let mut closed = Vec::new();

    for obs in observations {
        if obs.is_online() {
            if let Some(outage) = open.remove(obs.host()) {
                closed.push(outage);
            }
            continue;
        }

        open.entry(obs.host())
            .and_modify(|outage| {
                outage.end = obs.timestamp();
                outage.samples += 1;
            })
            .or_insert_with(|| Outage {
                host: obs.host().to_string(),
                start: obs.timestamp(),
                end: obs.timestamp(),
                samples: 1,
            });
    }

    closed.extend(open.into_values());
    closed.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.host.cmp(&b.host)));
    closed
}

/// Full analysis result for one log file.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Line counters from reading the log.
    pub stats: ReadStats,
    /// Figures over every observation.
    pub overall: Summary,
    /// Figures per host.
    pub hosts: BTreeMap<String, Summary>,
    /// Outage windows across all hosts.
    pub outages: Vec<Outage>,
}

impl Report {
    /// Analyze observations read from a log.
    pub fn new(observations: Vec<Observation>, stats: ReadStats) -> Self {
        let overall = Summary::from_observations(&observations);
        let outages = outages(&observations);
        let hosts = summarize_by_host(&group_by_host(observations));

        Self {
            stats,
            overall,
            hosts,
            outages,
        }
    }

    /// Whether the log contained no usable observations.
    pub fn is_empty(&self) -> bool {
        self.overall.is_empty()
    }
}
