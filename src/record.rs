//! Capture attempts and the persisted capture record.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::backend::OutputOptions;
use crate::error::CaptureError;
use crate::exposure::{CaptureSettings, LightingSample, PlanSource};

/// Why a single capture attempt did not yield a usable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptFailure {
    /// The tool did not finish in time and was killed.
    Timeout { timeout_ms: u64 },
    /// The tool reported success but left no usable file.
    Incomplete { reason: String },
    /// The tool exited unsuccessfully.
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<i32>,
        stderr: String,
    },
    /// The file was written but could not be decoded for scoring.
    Unreadable { reason: String },
    /// Anything else (spawn errors and the like).
    Other { message: String },
}

impl AttemptFailure {
    /// Classify a backend error.
    pub fn from_error(err: &CaptureError) -> Self {
        match err {
            CaptureError::CaptureTimeout { timeout_ms, .. } => Self::Timeout {
                timeout_ms: *timeout_ms,
            },
            CaptureError::CaptureIncomplete { reason, .. } => Self::Incomplete {
                reason: reason.clone(),
            },
            CaptureError::CaptureFailed { code, stderr, .. } => Self::Failed {
                code: *code,
                stderr: stderr.clone(),
            },
            other => Self::Other {
                message: other.to_string(),
            },
        }
    }

    /// Rebuild the error this failure stands for.
    pub fn to_error(&self, backend: &str, path: &Path) -> CaptureError {
        match self {
            Self::Timeout { timeout_ms } => CaptureError::CaptureTimeout {
                backend: backend.to_string(),
                timeout_ms: *timeout_ms,
            },
            Self::Incomplete { reason } => CaptureError::CaptureIncomplete {
                path: path.display().to_string(),
                reason: reason.clone(),
            },
            Self::Failed { code, stderr } => CaptureError::CaptureFailed {
                backend: backend.to_string(),
                code: *code,
                stderr: stderr.clone(),
            },
            Self::Unreadable { reason } => CaptureError::CaptureIncomplete {
                path: path.display().to_string(),
                reason: format!("unreadable image: {reason}"),
            },
            Self::Other { message } => CaptureError::Other(message.clone()),
        }
    }
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { timeout_ms } => write!(f, "timed out after {timeout_ms} ms"),
            Self::Incomplete { reason } => write!(f, "incomplete: {reason}"),
            Self::Failed {
                code: Some(code),
                stderr,
            } => write!(f, "exit {code}: {stderr}"),
            Self::Failed { code: None, stderr } => write!(f, "killed: {stderr}"),
            Self::Unreadable { reason } => write!(f, "unreadable: {reason}"),
            Self::Other { message } => f.write_str(message),
        }
    }
}

/// One invocation of a capture backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureAttempt {
    /// Settings handed to the backend.
    pub settings: CaptureSettings,
    /// Preview measurement the settings were derived from, if any.
    #[serde(default)]
    pub lighting: Option<LightingSample>,
    /// Image produced by this attempt; `None` on failure or once discarded.
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    /// Backend identifier (tool name).
    pub backend: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<AttemptFailure>,
    /// EV offset for bracket frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ev_offset: Option<f64>,
    /// Statistics of the produced image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_analysis: Option<LightingSample>,
}

impl CaptureAttempt {
    pub fn succeeded(backend: &str, settings: CaptureSettings, path: PathBuf) -> Self {
        Self {
            settings,
            lighting: None,
            file_path: Some(path),
            backend: backend.to_string(),
            success: true,
            failure: None,
            ev_offset: None,
            result_analysis: None,
        }
    }

    pub fn failed(backend: &str, settings: CaptureSettings, failure: AttemptFailure) -> Self {
        Self {
            settings,
            lighting: None,
            file_path: None,
            backend: backend.to_string(),
            success: false,
            failure: Some(failure),
            ev_offset: None,
            result_analysis: None,
        }
    }

    /// Build an attempt from a backend's raw result.
    pub fn from_result(
        backend: &str,
        settings: CaptureSettings,
        result: crate::error::Result<PathBuf>,
    ) -> Self {
        match result {
            Ok(path) => Self::succeeded(backend, settings, path),
            Err(err) => Self::failed(backend, settings, AttemptFailure::from_error(&err)),
        }
    }

    #[must_use]
    pub fn with_lighting(mut self, lighting: Option<LightingSample>) -> Self {
        self.lighting = lighting;
        self
    }

    #[must_use]
    pub const fn with_ev_offset(mut self, ev: f64) -> Self {
        self.ev_offset = Some(ev);
        self
    }

    /// Mark a written-but-unusable attempt as failed.
    pub fn mark_unreadable(&mut self, reason: String) {
        self.success = false;
        self.file_path = None;
        self.failure = Some(AttemptFailure::Unreadable { reason });
    }
}

/// Persisted description of one successful top-level capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Local wall-clock time at capture start, whole seconds.
    pub timestamp: NaiveDateTime,
    /// How the settings were chosen.
    pub plan: PlanSource,
    /// Resolution, quality and flips requested from the tool.
    pub output: OutputOptions,
    /// The attempt whose file was kept.
    pub attempt: CaptureAttempt,
    /// Other bracket frames, whose files were deleted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discarded: Vec<CaptureAttempt>,
}

impl CaptureRecord {
    /// Path of the kept image.
    pub fn image_path(&self) -> Option<&Path> {
        self.attempt.file_path.as_deref()
    }
}
