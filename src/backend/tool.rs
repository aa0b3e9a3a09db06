//! Backends that drive an installed still-capture utility.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::process::run_tool;
use super::{CaptureBackend, OutputOptions};
use crate::error::{CaptureError, Result};
use crate::exposure::{CaptureSettings, WhiteBalance};
use crate::record::CaptureAttempt;

/// Preview frame size and quality; small enough to be fast.
const PREVIEW_WIDTH: u32 = 320;
const PREVIEW_HEIGHT: u32 = 240;
const PREVIEW_QUALITY: u8 = 50;

/// Known capture utilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureTool {
    /// `rpicam-still` from rpicam-apps.
    RpicamStill,
    /// `libcamera-still`, the earlier name of the same tool.
    LibcameraStill,
    /// `raspistill` from the legacy camera stack.
    Raspistill,
}

impl CaptureTool {
    /// Default preference order.
    pub const DEFAULT_ORDER: [Self; 3] = [Self::RpicamStill, Self::LibcameraStill, Self::Raspistill];

    /// Executable name looked up on `PATH`.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::RpicamStill => "rpicam-still",
            Self::LibcameraStill => "libcamera-still",
            Self::Raspistill => "raspistill",
        }
    }

    const fn is_libcamera(self) -> bool {
        matches!(self, Self::RpicamStill | Self::LibcameraStill)
    }

    /// Arguments for a full capture.
    pub fn capture_args(
        self,
        settings: &CaptureSettings,
        options: &OutputOptions,
        output: &Path,
    ) -> Vec<String> {
        let mut args = Vec::new();
        if self.is_libcamera() {
            args.extend(["--nopreview".to_string(), "--immediate".to_string()]);
            push(&mut args, "--width", options.width);
            push(&mut args, "--height", options.height);
            push(&mut args, "--quality", options.quality);
            push(&mut args, "--shutter", settings.exposure_us());
            // Analogue gain 1.0 corresponds to ISO 100.
            push(
                &mut args,
                "--gain",
                format!("{:.2}", f64::from(settings.iso()) / 100.0),
            );
            push(&mut args, "--awb", libcamera_awb(settings.white_balance()));
            if settings.white_balance() == WhiteBalance::Custom {
                let (r, b) = WhiteBalance::CUSTOM_GAINS;
                push(&mut args, "--awbgains", format!("{r},{b}"));
            }
            push(
                &mut args,
                "--ev",
                format!("{:.2}", settings.ev_compensation()),
            );
            if options.hflip {
                args.push("--hflip".to_string());
            }
            if options.vflip {
                args.push("--vflip".to_string());
            }
        } else {
            args.push("-n".to_string());
            push(&mut args, "-t", 1);
            push(&mut args, "-w", options.width);
            push(&mut args, "-h", options.height);
            push(&mut args, "-q", options.quality);
            push(&mut args, "-ss", settings.exposure_us());
            push(&mut args, "-ISO", settings.iso());
            push(&mut args, "-awb", raspistill_awb(settings.white_balance()));
            if settings.white_balance() == WhiteBalance::Custom {
                let (r, b) = WhiteBalance::CUSTOM_GAINS;
                push(&mut args, "-awbg", format!("{r},{b}"));
            }
            // raspistill takes EV in sixths of a stop, -10..=10.
            let ev = (settings.ev_compensation() * 6.0).round().clamp(-10.0, 10.0) as i32;
            push(&mut args, "-ev", ev);
            if options.hflip {
                args.push("-hf".to_string());
            }
            if options.vflip {
                args.push("-vf".to_string());
            }
        }
        push(&mut args, "-o", output.display());
        args
    }

    /// Arguments for a small auto-exposed probe frame.
    pub fn preview_args(self, dest: &Path) -> Vec<String> {
        let mut args = Vec::new();
        if self.is_libcamera() {
            args.extend(["--nopreview".to_string(), "--immediate".to_string()]);
            push(&mut args, "--width", PREVIEW_WIDTH);
            push(&mut args, "--height", PREVIEW_HEIGHT);
            push(&mut args, "--quality", PREVIEW_QUALITY);
        } else {
            args.push("-n".to_string());
            push(&mut args, "-t", 1);
            push(&mut args, "-w", PREVIEW_WIDTH);
            push(&mut args, "-h", PREVIEW_HEIGHT);
            push(&mut args, "-q", PREVIEW_QUALITY);
        }
        push(&mut args, "-o", dest.display());
        args
    }
}

impl std::fmt::Display for CaptureTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

fn push(args: &mut Vec<String>, flag: &str, value: impl std::fmt::Display) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

const fn libcamera_awb(wb: WhiteBalance) -> &'static str {
    match wb {
        WhiteBalance::Auto => "auto",
        WhiteBalance::Daylight => "daylight",
        WhiteBalance::Cloudy => "cloudy",
        WhiteBalance::Custom => "custom",
    }
}

const fn raspistill_awb(wb: WhiteBalance) -> &'static str {
    match wb {
        WhiteBalance::Auto => "auto",
        WhiteBalance::Daylight => "sun",
        WhiteBalance::Cloudy => "cloud",
        WhiteBalance::Custom => "off",
    }
}

/// Look up every tool in `order` on `PATH`.
pub fn probe_tools(order: &[CaptureTool]) -> Vec<(CaptureTool, Option<PathBuf>)> {
    order
        .iter()
        .map(|&tool| (tool, which::which(tool.program()).ok()))
        .collect()
}

/// A [`CaptureBackend`] backed by an external executable.
#[derive(Debug, Clone)]
pub struct ToolBackend {
    tool: CaptureTool,
    program: Option<PathBuf>,
    options: OutputOptions,
}

impl ToolBackend {
    /// Resolve `tool` on `PATH` once; the result is cached for the run.
    #[must_use]
    pub fn new(tool: CaptureTool, options: OutputOptions) -> Self {
        let program = which::which(tool.program()).ok();
        debug!(%tool, found = ?program, "Probed capture tool");
        Self {
            tool,
            program,
            options,
        }
    }

    /// One backend per tool, in preference order.
    pub fn candidates(order: &[CaptureTool], options: OutputOptions) -> Vec<Self> {
        order.iter().map(|&tool| Self::new(tool, options)).collect()
    }

    pub const fn tool(&self) -> CaptureTool {
        self.tool
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    fn resolved(&self) -> Result<&Path> {
        self.program
            .as_deref()
            .ok_or_else(|| CaptureError::NoBackendAvailable {
                tried: vec![self.tool.program().to_string()],
            })
    }

    fn run_capture(&self, settings: &CaptureSettings, output: &Path, timeout_ms: u64) -> Result<()> {
        let program = self.resolved()?;
        let args = self.tool.capture_args(settings, &self.options, output);
        run_tool(self.tool.program(), program, &args, timeout_ms)?;
        verify_output(output)
    }
}

/// Check that the tool actually left a non-empty file behind.
fn verify_output(output: &Path) -> Result<()> {
    match std::fs::metadata(output) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(CaptureError::CaptureIncomplete {
            path: output.display().to_string(),
            reason: "output file is empty".to_string(),
        }),
        Err(_) => Err(CaptureError::CaptureIncomplete {
            path: output.display().to_string(),
            reason: "output file was not created".to_string(),
        }),
    }
}

/// Remove whatever a failed run left at `path`.
///
/// Only called for paths that did not exist before the run started.
pub(crate) fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Could not remove partial output"),
    }
}

impl CaptureBackend for ToolBackend {
    fn id(&self) -> &str {
        self.tool.program()
    }

    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    #[instrument(skip(self, settings), fields(backend = self.tool.program(), %settings, output = %output.display()))]
    fn capture(
        &self,
        settings: &CaptureSettings,
        output: &Path,
        timeout_ms: u64,
    ) -> CaptureAttempt {
        if output.symlink_metadata().is_ok() {
            warn!("Output path already exists, not capturing over it");
            let err = CaptureError::CaptureFailed {
                backend: self.id().to_string(),
                code: None,
                stderr: format!("refusing to overwrite existing {}", output.display()),
            };
            return CaptureAttempt::from_result(self.id(), *settings, Err(err));
        }

        let result = self.run_capture(settings, output, timeout_ms);
        if let Err(e) = &result {
            warn!(error = %e, "Capture attempt failed");
            remove_partial(output);
        }
        CaptureAttempt::from_result(
            self.id(),
            *settings,
            result.map(|()| output.to_path_buf()),
        )
    }

    fn preview(&self, dest: &Path, timeout_ms: u64) -> Result<()> {
        let unavailable = |e: CaptureError| CaptureError::AnalysisUnavailable(e.to_string());
        let program = self.resolved().map_err(unavailable)?;
        let args = self.tool.preview_args(dest);
        run_tool(self.tool.program(), program, &args, timeout_ms)
            .and_then(|()| verify_output(dest))
            .map_err(|e| {
                remove_partial(dest);
                unavailable(e)
            })
    }
}
