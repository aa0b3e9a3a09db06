//! Capture configuration.
//!
//! # Example TOML
//!
//! ```toml
//! output_dir = "~/camera/incoming"
//! adaptive = true
//! bracket = false
//! bracket_offsets = [-1.0, 0.0, 1.0]
//! metadata = "embedded"
//! capture_timeout_ms = 30000
//! backends = ["rpicam-still", "libcamera-still", "raspistill"]
//!
//! [output]
//! width = 1920
//! height = 1080
//! quality = 85
//! hflip = false
//! vflip = false
//!
//! [sensor]
//! min_iso = 100
//! max_iso = 1600
//!
//! # Optional; disables all inference when present.
//! [manual]
//! exposure_us = 20000
//! iso = 400
//! white_balance = "cloudy"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::path::PathResolver;
use crate::backend::{CaptureTool, OutputOptions};
use crate::bracket::DEFAULT_OFFSETS;
use crate::error::{CaptureError, Result};
use crate::exposure::{ManualOverride, SensorLimits};
use crate::metadata::MetadataMode;

/// Most bracket frames a single invocation may take.
pub const MAX_BRACKET_OFFSETS: usize = 5;
/// Name of the capture log when no path is configured.
pub const DEFAULT_LOG_NAME: &str = "capture.log";

/// Everything one `capture` invocation needs.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Directory receiving `captured_*.jpg` files.
    pub output_dir: PathBuf,

    /// Capture log path. Defaults to `capture.log` inside `output_dir`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Measure a preview frame and refine the time-of-day recipe.
    pub adaptive: bool,

    /// Capture at several EV offsets and keep the best frame.
    pub bracket: bool,

    /// EV offsets used when bracketing.
    pub bracket_offsets: Vec<f64>,

    /// Fixed settings that bypass inference and bracketing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual: Option<ManualOverride>,

    pub output: OutputOptions,

    pub metadata: MetadataMode,

    /// Upper bound on one capture call.
    pub capture_timeout_ms: u64,

    /// Upper bound on the preview probe.
    pub preview_timeout_ms: u64,

    /// Capture tools in preference order.
    pub backends: Vec<CaptureTool>,

    pub sensor: SensorLimits,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("incoming"),
            log_file: None,
            adaptive: true,
            bracket: false,
            bracket_offsets: DEFAULT_OFFSETS.to_vec(),
            manual: None,
            output: OutputOptions::default(),
            metadata: MetadataMode::default(),
            capture_timeout_ms: 30_000,
            preview_timeout_ms: 10_000,
            backends: CaptureTool::DEFAULT_ORDER.to_vec(),
            sensor: SensorLimits::default(),
        }
    }
}

impl CaptureConfig {
    /// Validate the configuration.
    ///
    /// Checks that:
    /// - Resolution is non-zero and quality is 1-100
    /// - Timeouts are non-zero
    /// - Bracket offsets are finite, non-empty, at most five
    /// - Sensor limits are coherent and any manual override lies inside them
    /// - At least one backend is listed
    pub fn validate(&self) -> Result<()> {
        trace!("Validating capture config");

        if self.output.width == 0 || self.output.height == 0 {
            return Err(CaptureError::ConfigInvalid(format!(
                "resolution {}x{} must be non-zero",
                self.output.width, self.output.height
            )));
        }
        if !(1..=100).contains(&self.output.quality) {
            return Err(CaptureError::ConfigInvalid(format!(
                "quality {} must be 1-100",
                self.output.quality
            )));
        }
        if self.capture_timeout_ms == 0 || self.preview_timeout_ms == 0 {
            return Err(CaptureError::ConfigInvalid(
                "timeouts must be greater than 0 ms".to_string(),
            ));
        }
        if self.bracket_offsets.is_empty() || self.bracket_offsets.len() > MAX_BRACKET_OFFSETS {
            return Err(CaptureError::ConfigInvalid(format!(
                "bracket_offsets must have 1-{MAX_BRACKET_OFFSETS} entries, got {}",
                self.bracket_offsets.len()
            )));
        }
        if let Some(bad) = self.bracket_offsets.iter().find(|ev| !ev.is_finite()) {
            return Err(CaptureError::ConfigInvalid(format!(
                "bracket offset {bad} is not finite"
            )));
        }
        for (i, ev) in self.bracket_offsets.iter().enumerate() {
            if self.bracket_offsets[..i].contains(ev) {
                return Err(CaptureError::ConfigInvalid(format!(
                    "bracket offset {ev} is listed more than once"
                )));
            }
        }
        if self.backends.is_empty() {
            return Err(CaptureError::ConfigInvalid(
                "backends must list at least one capture tool".to_string(),
            ));
        }
        self.sensor.validate()?;
        if let Some(manual) = &self.manual {
            manual.validate(&self.sensor)?;
        }
        Ok(())
    }

    /// Resolve `output_dir` and `log_file` relative to the config file.
    pub fn resolve_paths(&mut self, config_path: &Path) -> Result<()> {
        let resolver = PathResolver::new(config_path)?;
        self.output_dir = resolver.resolve(&self.output_dir)?;
        if let Some(log) = &self.log_file {
            self.log_file = Some(resolver.resolve(log)?);
        }
        Ok(())
    }

    /// Effective capture log path.
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join(DEFAULT_LOG_NAME))
    }

    /// Whether bracketing will actually run (manual settings disable it).
    pub const fn brackets(&self) -> bool {
        self.bracket && self.manual.is_none()
    }
}
