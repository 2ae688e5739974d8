//! Storage Layer
//!
//! Durable, append-only text log of observations:
//! - **Writer**: Single owner for the session, one flushed line per append
//! - **Reader**: Independent read-only access for analysis, restartable
//!
//! # Components
//!
//! - [`LogWriter`] / [`OpenMode`]: Session log ownership and appends
//! - [`LogReader`] / [`Observations`]: Lazy, tolerant parsing of a log file
//! - [`StorageError`]: Open, write, read and missing-file failures

mod error;
mod reader;
mod writer;

pub use error::StorageError;
pub use reader::{
    HostObservations, LogReader, Observations, ReadStats, group_by_host, read_all, read_grouped,
};
pub use writer::{LogWriter, OpenMode};
