//! Output mode abstraction for robot and human output.

use std::path::PathBuf;

use serde::Serialize;

use crate::backend::CaptureTool;
use crate::cli::Cli;
use crate::error::CaptureError;
use crate::exposure::{BrightnessBand, CaptureSettings, Plan, PlanSource, TimeBucket};
use crate::pipeline::CaptureOutcome;
use crate::record::CaptureRecord;

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

/// Result of `adaptcap plan`: what a capture at `hour` would use.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub hour: u32,
    pub bucket: TimeBucket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<BrightnessBand>,
    pub plan: PlanSource,
    pub settings: CaptureSettings,
}

impl PlanReport {
    #[must_use]
    pub fn new(hour: u32, bucket: TimeBucket, brightness: Option<u8>, plan: Plan) -> Self {
        let band = match plan.source {
            PlanSource::TimeOfDay { band, .. } => band,
            PlanSource::Manual => None,
        };
        Self {
            hour,
            bucket,
            brightness,
            band,
            plan: plan.source,
            settings: plan.settings,
        }
    }
}

/// One capture tool and where it was found.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub tool: CaptureTool,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
}

impl BackendStatus {
    #[must_use]
    pub fn from_probe(probe: Vec<(CaptureTool, Option<PathBuf>)>) -> Vec<Self> {
        probe
            .into_iter()
            .map(|(tool, program)| Self {
                tool,
                available: program.is_some(),
                program,
            })
            .collect()
    }
}

/// Build details for `adaptcap version`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_sha: &'static str,
    pub build_timestamp: &'static str,
    pub rustc: &'static str,
    pub target: &'static str,
}

/// JSON formatting options for robot mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotFormat {
    /// Pretty-printed JSON (default for --robot).
    Json,
    /// Single-line JSON (--format=json-compact).
    JsonCompact,
}

/// Determines how command output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// JSON output for scripts and schedulers.
    Robot(RobotFormat),
    /// Styled terminal output; `color` is false under --no-color or without a TTY.
    Human { color: bool },
}

impl OutputMode {
    /// Create OutputMode from CLI arguments.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.use_json() {
            let format = if cli.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            Self::Robot(format)
        } else {
            let color = !cli.no_color && console::colors_enabled();
            Self::Human { color }
        }
    }

    /// Returns true if output should be JSON.
    #[must_use]
    pub const fn is_robot(&self) -> bool {
        matches!(self, Self::Robot(_))
    }

    /// Convert into the appropriate Output implementation.
    #[must_use]
    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human { color } => Box::new(HumanOutput::new(color)),
        }
    }
}

/// Trait for all output operations.
///
/// Commands call these methods without knowing the output mode.
pub trait Output {
    // Basic messages
    fn success(&self, message: &str);
    fn error(&self, error: &CaptureError);
    fn warning(&self, message: &str);
    fn info(&self, message: &str);

    // Command results
    fn capture_outcome(&self, outcome: &CaptureOutcome);
    fn plan(&self, report: &PlanReport);
    fn record(&self, record: &CaptureRecord);
    fn backends(&self, backends: &[BackendStatus]);

    // Version
    fn version_info(&self, info: &VersionInfo);
}
