//! CLI argument definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::CaptureConfig;
use crate::error::Result;
use crate::exposure::{ManualOverride, WhiteBalance};
use crate::metadata::{MetadataMode, MetadataSource};

/// adaptcap - adaptive still capture for fixed outdoor cameras.
///
/// Picks exposure from the time of day and a quick preview measurement,
/// optionally brackets, and records what was used next to every image.
#[derive(Parser, Debug)]
#[command(name = "adaptcap", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "ADAPTCAP_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (YAML or TOML)
    #[arg(long, short = 'c', global = true, env = "ADAPTCAP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture one image
    Capture(CaptureArgs),

    /// Show the settings that would be used, without capturing
    Plan(PlanArgs),

    /// Print the capture record stored with an image
    ReadMetadata(ReadMetadataArgs),

    /// List capture tools in preference order and whether they are installed
    Backends,

    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

/// Arguments for a capture. Each flag overrides the config file.
///
/// # Examples
///
/// ```bash
/// # Adaptive capture into the configured directory
/// adaptcap capture
///
/// # Bracket three exposures, keep the best, sidecar metadata
/// adaptcap capture --bracket --metadata sidecar
///
/// # Fixed exposure
/// adaptcap capture --exposure 20000 --iso 400 --wb cloudy
/// ```
#[derive(Parser, Debug, Default)]
#[allow(clippy::struct_excessive_bools)] // CLI flags naturally use multiple bools
pub struct CaptureArgs {
    /// Directory for captured images
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Skip the preview measurement and use time-of-day settings only
    #[arg(long)]
    pub no_adaptive: bool,

    /// Capture several exposures and keep the best
    #[arg(long)]
    pub bracket: bool,

    /// Manual exposure time in microseconds (requires --iso)
    #[arg(long, requires = "iso")]
    pub exposure: Option<u32>,

    /// Manual ISO (requires --exposure)
    #[arg(long, requires = "exposure")]
    pub iso: Option<u32>,

    /// White balance for a manual capture
    #[arg(long, requires = "exposure")]
    pub wb: Option<WhiteBalance>,

    /// EV compensation for a manual capture
    #[arg(long, requires = "exposure", allow_hyphen_values = true)]
    pub ev: Option<f64>,

    /// Image width
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height
    #[arg(long)]
    pub height: Option<u32>,

    /// JPEG quality (1-100)
    #[arg(long)]
    pub quality: Option<u8>,

    /// Where to store the capture record
    #[arg(long)]
    pub metadata: Option<MetadataMode>,

    /// Capture timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Flip horizontally
    #[arg(long)]
    pub hflip: bool,

    /// Flip vertically
    #[arg(long)]
    pub vflip: bool,

    /// Capture log file (default: capture.log in the output directory)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl CaptureArgs {
    /// Apply command-line overrides on top of a loaded config, then revalidate.
    pub fn apply_to(&self, config: &mut CaptureConfig) -> Result<()> {
        if let Some(dir) = &self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if self.no_adaptive {
            config.adaptive = false;
        }
        if self.bracket {
            config.bracket = true;
        }
        if let (Some(exposure_us), Some(iso)) = (self.exposure, self.iso) {
            config.manual = Some(ManualOverride {
                exposure_us,
                iso,
                white_balance: self.wb.unwrap_or_default(),
                ev_compensation: self.ev.unwrap_or(0.0),
            });
        }
        if let Some(width) = self.width {
            config.output.width = width;
        }
        if let Some(height) = self.height {
            config.output.height = height;
        }
        if let Some(quality) = self.quality {
            config.output.quality = quality;
        }
        if let Some(mode) = self.metadata {
            config.metadata = mode;
        }
        if let Some(timeout) = self.timeout_ms {
            config.capture_timeout_ms = timeout;
        }
        config.output.hflip |= self.hflip;
        config.output.vflip |= self.vflip;
        if let Some(log) = &self.log_file {
            config.log_file = Some(log.clone());
        }
        config.validate()
    }
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Hour of day (0-23); defaults to the current hour
    #[arg(long)]
    pub hour: Option<u32>,

    /// Pretend a preview measured this mean brightness (0-255)
    #[arg(long)]
    pub brightness: Option<u8>,
}

#[derive(Parser, Debug)]
pub struct ReadMetadataArgs {
    /// Captured image
    pub image: PathBuf,

    /// Where to look for the record
    #[arg(long, default_value = "auto")]
    pub source: MetadataSource,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
