//! Mock capture backend for testing.
//!
//! Records every call and writes synthetic uniform-grey JPEG frames, so the
//! planner, bracketing and metadata paths can be exercised without a camera.
//!
//! # Example
//!
//! ```rust,ignore
//! use adaptcap::backend::mock::{MockBackend, MockOutcome};
//!
//! let mock = MockBackend::new("mock")
//!     .with_outcomes([MockOutcome::Frame(60), MockOutcome::Timeout]);
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{GrayImage, Luma};
use tracing::debug;

use super::CaptureBackend;
use crate::error::{CaptureError, Result};
use crate::exposure::CaptureSettings;
use crate::record::{AttemptFailure, CaptureAttempt};

const FRAME_WIDTH: u32 = 32;
const FRAME_HEIGHT: u32 = 24;

/// Recorded call for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Capture {
        settings: CaptureSettings,
        path: PathBuf,
        timeout_ms: u64,
    },
    Preview {
        path: PathBuf,
    },
}

/// Scripted result of one capture call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutcome {
    /// Write a uniform frame of this luma.
    Frame(u8),
    /// Report a timeout; write nothing.
    Timeout,
    /// Report success but leave no file.
    Incomplete,
    /// Report a non-zero exit.
    Failed,
    /// Write bytes that are not a decodable image.
    Corrupt,
}

/// Mock backend that records calls.
#[derive(Debug)]
pub struct MockBackend {
    id: String,
    available: bool,
    preview_luma: Option<u8>,
    outcomes: Mutex<VecDeque<MockOutcome>>,
    operation_log: Mutex<Vec<Operation>>,
}

impl MockBackend {
    /// Available mock whose captures all succeed with mid-grey frames.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            available: true,
            preview_luma: None,
            outcomes: Mutex::new(VecDeque::new()),
            operation_log: Mutex::new(Vec::new()),
        }
    }

    /// Mock that reports itself as not installed.
    #[must_use]
    pub fn unavailable(id: &str) -> Self {
        Self {
            available: false,
            ..Self::new(id)
        }
    }

    /// Let `preview` produce frames of the given luma.
    #[must_use]
    pub const fn with_preview(mut self, luma: u8) -> Self {
        self.preview_luma = Some(luma);
        self
    }

    /// Queue capture results; once drained, captures yield `Frame(128)`.
    #[must_use]
    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        self.lock_outcomes().extend(outcomes);
        self
    }

    /// All recorded operations, in call order.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock_log().clone()
    }

    /// Settings of every capture call, in order.
    pub fn captured_settings(&self) -> Vec<CaptureSettings> {
        self.lock_log()
            .iter()
            .filter_map(|op| match op {
                Operation::Capture { settings, .. } => Some(*settings),
                Operation::Preview { .. } => None,
            })
            .collect()
    }

    /// Number of capture calls.
    pub fn capture_count(&self) -> usize {
        self.captured_settings().len()
    }

    /// Assert operations match exactly.
    ///
    /// # Panics
    ///
    /// Panics if the recorded operations differ from `expected`.
    pub fn assert_operations(&self, expected: &[Operation]) {
        let actual = self.operations();
        assert_eq!(
            actual, expected,
            "Operations mismatch:\nExpected: {expected:#?}\nActual: {actual:#?}"
        );
    }

    fn lock_log(&self) -> std::sync::MutexGuard<'_, Vec<Operation>> {
        self.operation_log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_outcomes(&self) -> std::sync::MutexGuard<'_, VecDeque<MockOutcome>> {
        self.outcomes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn next_outcome(&self) -> MockOutcome {
        self.lock_outcomes()
            .pop_front()
            .unwrap_or(MockOutcome::Frame(128))
    }
}

/// Write a uniform grey JPEG at `path`.
pub fn write_frame(path: &Path, luma: u8) -> Result<()> {
    GrayImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Luma([luma]))
        .save(path)
        .map_err(|e| CaptureError::ImageProcessing(format!("writing mock frame: {e}")))
}

impl CaptureBackend for MockBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn capture(
        &self,
        settings: &CaptureSettings,
        output: &Path,
        timeout_ms: u64,
    ) -> CaptureAttempt {
        self.lock_log().push(Operation::Capture {
            settings: *settings,
            path: output.to_path_buf(),
            timeout_ms,
        });
        let outcome = self.next_outcome();
        debug!(id = %self.id, ?outcome, output = %output.display(), "Mock capture");

        let result = match outcome {
            MockOutcome::Frame(luma) => write_frame(output, luma).map(|()| output.to_path_buf()),
            MockOutcome::Corrupt => std::fs::write(output, b"not a jpeg")
                .map(|()| output.to_path_buf())
                .map_err(CaptureError::from),
            MockOutcome::Timeout => Err(CaptureError::CaptureTimeout {
                backend: self.id.clone(),
                timeout_ms,
            }),
            MockOutcome::Incomplete => Err(CaptureError::CaptureIncomplete {
                path: output.display().to_string(),
                reason: "output file was not created".to_string(),
            }),
            MockOutcome::Failed => Err(CaptureError::CaptureFailed {
                backend: self.id.clone(),
                code: Some(1),
                stderr: "mock failure".to_string(),
            }),
        };

        match result {
            Ok(path) => CaptureAttempt::succeeded(&self.id, *settings, path),
            Err(e) => CaptureAttempt::failed(&self.id, *settings, AttemptFailure::from_error(&e)),
        }
    }

    fn preview(&self, dest: &Path, _timeout_ms: u64) -> Result<()> {
        self.lock_log().push(Operation::Preview {
            path: dest.to_path_buf(),
        });
        match self.preview_luma {
            Some(luma) => write_frame(dest, luma)
                .map_err(|e| CaptureError::AnalysisUnavailable(e.to_string())),
            None => Err(CaptureError::AnalysisUnavailable(format!(
                "{} has no preview",
                self.id
            ))),
        }
    }
}
