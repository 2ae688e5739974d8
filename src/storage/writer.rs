//! Append-only log writer.
//!
//! Single-writer pattern: one owner holds the file for the whole session and
//! writes each observation as one complete, flushed line.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write as _};
use std::path::{Path, PathBuf};

use crate::record::Observation;
use crate::storage::StorageError;

/// How to open the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Discard any previous content (fresh session log).
    #[default]
    Truncate,
    /// Keep previous content and add new lines after it.
    Append,
}

/// Owner of the session log file.
pub struct LogWriter {
    path: PathBuf,
    file: File,
    sync_data: bool,
    lines_written: u64,
    line_buf: String,
    /// The appended-to file ended mid-line; terminate it before the next line.
    needs_newline: bool,
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("path", &self.path)
            .field("sync_data", &self.sync_data)
            .field("lines_written", &self.lines_written)
            .field("needs_newline", &self.needs_newline)
            .finish_non_exhaustive()
    }
}

impl LogWriter {
    /// Open (or create) the log file at `path`.
    ///
    /// Missing parent directories are created. In `Append` mode a file left
    /// ending in a partial line gets that line terminated before the first
    /// append, so the new line is not glued onto the fragment.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| StorageError::Open {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(open_err)?;
        }

        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Truncate => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.read(true).append(true).create(true),
        };
        let mut file = options.open(&path).map_err(open_err)?;

        let needs_newline = match mode {
            OpenMode::Truncate => false,
            OpenMode::Append => ends_mid_line(&mut file).map_err(open_err)?,
        };
        if needs_newline {
            tracing::warn!(path = %path.display(), "Log file ends with a partial line");
        }

        tracing::debug!(path = %path.display(), ?mode, "Log file opened");

        Ok(Self {
            path,
            file,
            sync_data: false,
            lines_written: 0,
            line_buf: String::with_capacity(128),
            needs_newline,
        })
    }

    /// Also `fsync` file data after every line.
    pub fn with_sync_data(mut self, sync_data: bool) -> Self {
        self.sync_data = sync_data;
        self
    }

    /// Append one observation as a single terminated line.
    ///
    /// The line is written with one `write_all` and flushed before returning,
    /// so earlier lines stay intact if the process dies mid-session.
    pub fn append(&mut self, observation: &Observation) -> Result<(), StorageError> {
        self.line_buf.clear();
        if self.needs_newline {
            self.line_buf.push('\n');
        }
        // Writing into a String cannot fail.
        let _ = writeln!(self.line_buf, "{observation}");

        let write_err = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };

        self.file
            .write_all(self.line_buf.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(write_err)?;
        if self.sync_data {
            self.file.sync_data().map_err(write_err)?;
        }

        self.needs_newline = false;
        self.lines_written += 1;
        Ok(())
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines appended through this writer.
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }
}

/// Whether a regular, non-empty file lacks a trailing `\n`.
fn ends_mid_line(file: &mut File) -> std::io::Result<bool> {
    let metadata = file.metadata()?;
    if !metadata.is_file() || metadata.len() == 0 {
        return Ok(false);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
