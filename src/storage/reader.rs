//! Log reader for offline analysis.
//!
//! Reads a log file back into [`Observation`]s. Lines that do not parse are
//! skipped and counted, never treated as a failure of the whole read.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::record::{LEGACY_HOST, Observation};
use crate::storage::StorageError;

/// Observations grouped by host, each group in log order.
pub type HostObservations = BTreeMap<String, Vec<Observation>>;

/// Line counters for one pass over a log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadStats {
    /// Lines that produced an observation.
    pub parsed: usize,
    /// Non-empty lines that were skipped as malformed.
    pub skipped: usize,
}

/// Read-only handle to a log file.
///
/// The file is reopened on every read, so reading an unchanged file twice
/// yields the same sequence.
#[derive(Debug, Clone)]
pub struct LogReader {
    path: PathBuf,
    legacy_host: String,
}

impl LogReader {
    /// Create a reader for an existing log file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(StorageError::NotFound(path));
        }
        Ok(Self {
            path,
            legacy_host: LEGACY_HOST.to_string(),
        })
    }

    /// Host to assign to lines in the legacy single-host layout.
    pub fn with_legacy_host(mut self, host: impl Into<String>) -> Self {
        self.legacy_host = host.into();
        self
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily iterate over the observations in the file.
    pub fn observations(&self) -> Result<Observations, StorageError> {
        let file = File::open(&self.path).map_err(|source| StorageError::Read {
            path: self.path.clone(),
            source,
        })?;

        Ok(Observations {
            path: self.path.clone(),
            lines: BufReader::new(file),
            legacy_host: self.legacy_host.clone(),
            buf: Vec::new(),
            stats: ReadStats::default(),
            done: false,
        })
    }

    /// Read every observation in file order.
    pub fn read_all(&self) -> Result<(Vec<Observation>, ReadStats), StorageError> {
        let mut iter = self.observations()?;
        let observations = iter.by_ref().collect::<Result<Vec<_>, _>>()?;
        Ok((observations, iter.stats()))
    }

    /// Read every observation and group it by host.
    pub fn read_grouped(&self) -> Result<(HostObservations, ReadStats), StorageError> {
        let (observations, stats) = self.read_all()?;
        Ok((group_by_host(observations), stats))
    }
}

/// Read all observations from `path`.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<Observation>, StorageError> {
    LogReader::open(path)?.read_all().map(|(obs, _)| obs)
}

/// Read all observations from `path`, grouped by host.
pub fn read_grouped(path: impl AsRef<Path>) -> Result<HostObservations, StorageError> {
    LogReader::open(path)?.read_grouped().map(|(grouped, _)| grouped)
}

/// Group observations by host, keeping per-host order.
pub fn group_by_host(observations: impl IntoIterator<Item = Observation>) -> HostObservations {
    let mut grouped = HostObservations::new();
    for obs in observations {
        grouped.entry(obs.host().to_string()).or_default().push(obs);
    }
    grouped
}

/// Lazy iterator over the observations of a log file.
///
/// Yields `Err` once and then stops if the underlying read fails.
pub struct Observations {
    path: PathBuf,
    lines: BufReader<File>,
    legacy_host: String,
    buf: Vec<u8>,
    stats: ReadStats,
    done: bool,
}

impl Observations {
    /// Counters for the lines consumed so far.
    pub fn stats(&self) -> ReadStats {
        self.stats
    }
}

impl Iterator for Observations {
    type Item = Result<Observation, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.lines.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    let Ok(line) = std::str::from_utf8(&self.buf) else {
                        self.stats.skipped += 1;
                        tracing::debug!(path = %self.path.display(), "Skipping non-UTF-8 log line");
                        continue;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match Observation::parse_line_with_legacy_host(line, &self.legacy_host) {
                        Some(obs) => {
                            self.stats.parsed += 1;
                            return Some(Ok(obs));
                        }
                        None => {
                            self.stats.skipped += 1;
                            tracing::debug!(
                                path = %self.path.display(),
                                line = %line.trim_end(),
                                "Skipping malformed log line"
                            );
                        }
                    }
                }
                Err(source) => {
                    self.done = true;
                    return Some(Err(StorageError::Read {
                        path: self.path.clone(),
                        source,
                    }));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID_A: &str = "2024-05-01 10:00:00 - a - Online - Latency: 10 ms - Packet Loss: 0%";
    const VALID_B: &str = "2024-05-01 10:00:00 - b - Offline - Latency: N/A ms - Packet Loss: N/A%";

    fn write_log(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = LogReader::open(dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_malformed_line_skipped() {
        let file = write_log(&[
            VALID_A,
            VALID_B,
            "2024-05-01 10:00:01 - a - Online - Late",
            VALID_A,
            VALID_B,
        ]);

        let (observations, stats) = LogReader::open(file.path()).unwrap().read_all().unwrap();
        assert_eq!(observations.len(), 4);
        assert_eq!(stats, ReadStats { parsed: 4, skipped: 1 });
    }

    #[test]
    fn test_blank_lines_not_counted() {
        let file = write_log(&[VALID_A, "", "   ", VALID_B]);
        let (observations, stats) = LogReader::open(file.path()).unwrap().read_all().unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(stats.skipped, 0);
    }

    #[test]
    fn test_non_utf8_line_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{VALID_A}").unwrap();
        file.write_all(&[0xff, 0xfe, b'\n']).unwrap();
        writeln!(file, "{VALID_B}").unwrap();
        file.flush().unwrap();

        let (observations, stats) = LogReader::open(file.path()).unwrap().read_all().unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_trailing_partial_line_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{VALID_A}").unwrap();
        write!(file, "2024-05-01 10:00:01 - a - Online - Latency: 1").unwrap();
        file.flush().unwrap();

        let observations = read_all(file.path()).unwrap();
        assert_eq!(observations.len(), 1);
    }

    #[test]
    fn test_reread_is_identical() {
        let file = write_log(&[VALID_A, VALID_B, "junk", VALID_A]);
        let reader = LogReader::open(file.path()).unwrap();

        let (first, _) = reader.read_all().unwrap();
        let (second, _) = reader.read_all().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_lazy_iteration_preserves_order() {
        let file = write_log(&[VALID_A, VALID_B]);
        let reader = LogReader::open(file.path()).unwrap();

        let hosts: Vec<String> = reader
            .observations()
            .unwrap()
            .map(|obs| obs.unwrap().host().to_string())
            .collect();
        assert_eq!(hosts, vec!["a", "b"]);
    }

    #[test]
    fn test_read_grouped() {
        let file = write_log(&[VALID_A, VALID_B, VALID_A]);
        let grouped = read_grouped(file.path()).unwrap();

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["a"].len(), 2);
        assert_eq!(grouped["b"].len(), 1);
    }

    #[test]
    fn test_legacy_lines_use_configured_host() {
        let file = write_log(&[
            "2024-05-01 10:00:00 - Online - Latency: 12.3 ms",
            "2024-05-01 10:00:01 - Offline - Latency: N/A",
        ]);

        let reader = LogReader::open(file.path()).unwrap().with_legacy_host("8.8.8.8");
        let (grouped, stats) = reader.read_grouped().unwrap();
        assert_eq!(stats.parsed, 2);
        assert_eq!(grouped["8.8.8.8"].len(), 2);
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let file = write_log(&[]);
        let (observations, stats) = LogReader::open(file.path()).unwrap().read_all().unwrap();
        assert!(observations.is_empty());
        assert_eq!(stats, ReadStats::default());
    }
}
