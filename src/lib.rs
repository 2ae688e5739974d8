//! connwatch - Connectivity Monitor Library
//!
//! This crate provides the core functionality for the connwatch monitor.
//! It can be used as a library by other Rust projects, or run as a standalone
//! binary with the `connwatch` executable.
//!
//! # Architecture
//!
//! - **Probe**: One `ping` per host, parsed per platform dialect
//! - **Record**: Normalized observation and its one-line text form
//! - **Storage**: Append-only log writer and tolerant reader
//! - **Scheduler**: Fixed-interval passes over a host set
//! - **Analysis**: Uptime, latency and packet-loss summaries, outage windows
//!
//! # Example
//!
//! ```rust,no_run
//! use connwatch::{LogWriter, MonitorConfig, OpenMode, PingProber, Scheduler};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MonitorConfig::new(["8.8.8.8", "1.1.1.1"])
//!         .with_interval(Duration::from_secs(1))
//!         .with_duration(Duration::from_secs(60));
//!     let writer = LogWriter::open("connectivity.log", OpenMode::Truncate)?;
//!
//!     let mut scheduler = Scheduler::new(config, PingProber::new(), writer)?;
//!     let report = scheduler.run().await?;
//!     println!("{} passes", report.passes);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod probe;
pub mod record;
pub mod scheduler;
pub mod storage;

pub use analysis::{Outage, Report, Summary};
pub use probe::{Dialect, PingProber, ProbeError, ProbeMetrics, Prober};
pub use record::{Observation, RecordError, Status};
pub use scheduler::{MonitorConfig, MonitorError, Scheduler, SessionReport, SessionState};
pub use storage::{LogReader, LogWriter, OpenMode, ReadStats, StorageError};
