//! Capture backend abstraction.
//!
//! A [`CaptureBackend`] wraps one still-capture utility. Real backends shell
//! out to an installed tool ([`ToolBackend`]); [`mock::MockBackend`] records
//! calls and writes synthetic frames for tests.

pub mod mock;
mod process;
mod tool;

pub use tool::{CaptureTool, ToolBackend, probe_tools};

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CaptureError, Result};
use crate::exposure::CaptureSettings;
use crate::record::CaptureAttempt;

/// Resolution, quality and orientation of the written image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub width: u32,
    pub height: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
    pub hflip: bool,
    pub vflip: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            quality: 85,
            hflip: false,
            vflip: false,
        }
    }
}

/// One physical capture utility.
///
/// # Implementation Notes
///
/// - `capture` writes exactly one file at `output` on success and leaves
///   nothing behind on failure
/// - Failures are reported inside the returned [`CaptureAttempt`], never by
///   panicking
pub trait CaptureBackend {
    /// Stable identifier, usually the tool name.
    fn id(&self) -> &str;

    /// Whether the backend can be used on this host.
    fn is_available(&self) -> bool;

    /// Capture one still with `settings` into `output`.
    fn capture(&self, settings: &CaptureSettings, output: &Path, timeout_ms: u64)
    -> CaptureAttempt;

    /// Write a small, cheap frame to `dest` for lighting analysis.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::AnalysisUnavailable`] if the backend cannot
    /// produce a probe frame.
    fn preview(&self, dest: &Path, timeout_ms: u64) -> Result<()> {
        let _ = (dest, timeout_ms);
        Err(CaptureError::AnalysisUnavailable(format!(
            "{} cannot take preview frames",
            self.id()
        )))
    }
}

impl<T: CaptureBackend + ?Sized> CaptureBackend for Box<T> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn capture(
        &self,
        settings: &CaptureSettings,
        output: &Path,
        timeout_ms: u64,
    ) -> CaptureAttempt {
        (**self).capture(settings, output, timeout_ms)
    }

    fn preview(&self, dest: &Path, timeout_ms: u64) -> Result<()> {
        (**self).preview(dest, timeout_ms)
    }
}

/// Type alias for boxed trait object.
pub type BoxedBackend = Box<dyn CaptureBackend>;

/// Pick the first available backend in preference order.
///
/// Availability is checked once per candidate; the chosen backend is used for
/// the rest of the invocation.
///
/// # Errors
///
/// Returns [`CaptureError::NoBackendAvailable`] listing every candidate tried.
pub fn select_backend<B: CaptureBackend>(candidates: &[B]) -> Result<&B> {
    for backend in candidates {
        if backend.is_available() {
            info!(backend = backend.id(), "Selected capture backend");
            return Ok(backend);
        }
        debug!(backend = backend.id(), "Backend not available");
    }
    Err(CaptureError::NoBackendAvailable {
        tried: candidates.iter().map(|b| b.id().to_string()).collect(),
    })
}
