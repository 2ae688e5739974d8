//! Storage-specific error types.
//!
//! All log file operations return [`StorageError`] on failure, which can be
//! matched to determine the underlying cause (open, write, read, missing).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The log file could not be opened or created.
    #[error("failed to open log file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Appending a line to the log failed.
    #[error("failed to write log file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the log failed for a reason other than a bad line.
    #[error("failed to read log file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The log file to analyze does not exist.
    #[error("log file '{}' does not exist", .0.display())]
    NotFound(PathBuf),
}
