//! Append-only, human-readable capture log.
//!
//! One line per top-level capture invocation:
//! `[YYYY-MM-DD HH:MM:SS] <message>`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDateTime;
use tracing::{error, info};

use crate::clock::log_stamp;
use crate::error::Result;

/// Destination for log lines. Implementations only ever append.
pub trait LogSink {
    fn append_line(&self, line: &str) -> Result<()>;
}

/// Appends to a file, creating it (and its directory) on first write.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn append_line(&self, line: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// In-memory sink; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemorySink {
    fn append_line(&self, line: &str) -> Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
        Ok(())
    }
}

/// Whether a logged capture succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Formats and appends capture log lines.
#[derive(Debug, Clone)]
pub struct CaptureLog<S> {
    sink: S,
}

impl<S: LogSink> CaptureLog<S> {
    pub const fn new(sink: S) -> Self {
        Self { sink }
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Append `[timestamp] message` and mirror it as a tracing event.
    pub fn append(&self, at: NaiveDateTime, outcome: Outcome, message: &str) -> Result<()> {
        let line = format_line(at, message);
        match outcome {
            Outcome::Success => info!(target: "adaptcap::capture_log", "{message}"),
            Outcome::Failure => error!(target: "adaptcap::capture_log", "{message}"),
        }
        self.sink.append_line(&line)
    }
}

/// `[YYYY-MM-DD HH:MM:SS] message`
pub fn format_line(at: NaiveDateTime, message: &str) -> String {
    format!("[{}] {message}", log_stamp(&at))
}
