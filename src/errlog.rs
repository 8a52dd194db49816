//! Durable, append-only error log.
//!
//! This file is the record an operator reads the morning after a batch;
//! the console only carries progress and the final summary. Each entry is one line,
//! `[YYYY-MM-DD HH:MM:SS] <message>`, in local time.
//!
//! The file is opened, appended to, and closed on every call. No handle is
//! held between entries and the file is never truncated or rotated.

use chrono::{Local, NaiveDateTime};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Handle to the error log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `message` with the current local time.
    ///
    /// The message is mirrored at `debug` level. A log file that cannot be
    /// written is reported as a warning and otherwise ignored; logging never
    /// aborts the batch.
    pub fn log(&self, message: &str) {
        debug!("{message}");
        if let Err(e) = self.append_at(Local::now().naive_local(), message) {
            warn!("Could not write to error log {}: {e}", self.path.display());
        }
    }

    /// Append one entry stamped with `at`.
    pub fn append_at(&self, at: NaiveDateTime, message: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", format_entry(at, message))
    }
}

/// Render a single log line (without the trailing newline).
///
/// Embedded newlines are flattened so one entry is always one line.
pub fn format_entry(at: NaiveDateTime, message: &str) -> String {
    let flat = message.replace("\r\n", " ").replace(['\n', '\r'], " ");
    format!("[{}] {}", at.format(TIMESTAMP_FORMAT), flat)
}
