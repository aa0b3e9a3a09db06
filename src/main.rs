//! adaptcap - unattended still capture with time-of-day and light-adaptive exposure.
//!
//! Provides both human-friendly and script-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};

use clap::Parser;
use console::style;
use serde::Serialize;
use tracing::debug;

use adaptcap::backend::{ToolBackend, probe_tools};
use adaptcap::capture_log::FileSink;
use adaptcap::cli::{self, Cli, Commands};
use adaptcap::clock::{Clock, SystemClock, hour_of};
use adaptcap::config::load_or_default;
use adaptcap::error::Result;
use adaptcap::exposure::{ExposurePlanner, LightingAnalyzer, TimeBucket};
use adaptcap::logging::init_logging;
use adaptcap::metadata::MetadataRecorder;
use adaptcap::output::{BackendStatus, Output, OutputMode, PlanReport, VersionInfo};
use adaptcap::pipeline::CapturePipeline;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();

    // Handle no-color flag or non-TTY
    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    init_logging(cli.use_json(), cli.verbose, cli.quiet);

    let output = OutputMode::from_cli(&cli).into_output();
    if let Err(e) = run(&cli, output.as_ref()) {
        output.error(&e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: &Cli, output: &dyn Output) -> Result<()> {
    match &cli.command {
        None => {
            print_quick_start(cli);
            Ok(())
        }
        Some(Commands::Capture(args)) => cmd_capture(cli, args, output),
        Some(Commands::Plan(args)) => cmd_plan(cli, args, output),
        Some(Commands::ReadMetadata(args)) => cmd_read_metadata(args, output),
        Some(Commands::Backends) => cmd_backends(cli, output),
        Some(Commands::Version) => {
            cmd_version(output);
            Ok(())
        }
        Some(Commands::Completions(args)) => {
            cmd_completions(args);
            Ok(())
        }
    }
}

// === Quick Start (Robot Mode Optimized) ===

#[derive(Serialize)]
struct RobotQuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    commands: QuickCommands,
    output_modes: OutputModes,
    exit_codes: ExitCodes,
}

#[derive(Serialize)]
struct QuickCommands {
    capture: &'static str,
    bracket: &'static str,
    manual: &'static str,
    plan: &'static str,
    read_metadata: &'static str,
    backends: &'static str,
}

#[derive(Serialize)]
struct OutputModes {
    human: &'static str,
    robot: &'static str,
    compact: &'static str,
}

#[derive(Serialize)]
struct ExitCodes {
    success: i32,
    capture_failed: i32,
    no_backend: i32,
    unwritable_output: i32,
    config: i32,
    other: i32,
}

const QUICK_COMMANDS: QuickCommands = QuickCommands {
    capture: "adaptcap capture --output-dir <DIR>",
    bracket: "adaptcap capture --bracket",
    manual: "adaptcap capture --exposure <US> --iso <ISO>",
    plan: "adaptcap plan --hour <0-23> [--brightness <0-255>]",
    read_metadata: "adaptcap read-metadata <IMAGE>",
    backends: "adaptcap backends",
};

/// Prints quick-start help for both humans and scripts.
fn print_quick_start(cli: &Cli) {
    if cli.use_json() {
        let help = RobotQuickStart {
            tool: "adaptcap",
            version: build_info::VERSION,
            description: "Adaptive still capture for fixed outdoor cameras",
            commands: QUICK_COMMANDS,
            output_modes: OutputModes {
                human: "--format=text (default)",
                robot: "--robot or --format=json",
                compact: "--format=json-compact",
            },
            exit_codes: ExitCodes {
                success: 0,
                capture_failed: 2,
                no_backend: 3,
                unwritable_output: 4,
                config: 78,
                other: 1,
            },
        };
        match serde_json::to_string_pretty(&help) {
            Ok(json) => println!("{json}"),
            Err(e) => debug!(error = %e, "Could not serialize quick start"),
        }
    } else {
        println!(
            "{} {} - adaptive still capture\n",
            style("adaptcap").bold().cyan(),
            build_info::VERSION
        );
        println!("{}", style("Common commands:").bold());
        for (what, example) in [
            ("Capture one image", QUICK_COMMANDS.capture),
            ("Bracket and keep the best", QUICK_COMMANDS.bracket),
            ("Fixed exposure", QUICK_COMMANDS.manual),
            ("Preview the planned settings", QUICK_COMMANDS.plan),
            ("Show an image's capture record", QUICK_COMMANDS.read_metadata),
            ("List capture tools", QUICK_COMMANDS.backends),
        ] {
            println!("  {:<32} {}", what, style(example).green());
        }
        println!("\nRun 'adaptcap --help' for all options, '--robot' for JSON output.");
    }
}

// === Commands ===

fn cmd_capture(cli: &Cli, args: &cli::CaptureArgs, output: &dyn Output) -> Result<()> {
    let (mut config, source) = load_or_default(cli.config.as_deref())?;
    debug!(config = ?source, "Configuration resolved");
    args.apply_to(&mut config)?;

    let candidates = ToolBackend::candidates(&config.backends, config.output);
    let sink = FileSink::new(config.log_path());
    let pipeline = CapturePipeline::new(config, SystemClock, sink);
    let outcome = pipeline.run(&candidates)?;

    if !cli.quiet || cli.use_json() {
        output.capture_outcome(&outcome);
    }
    Ok(())
}

fn cmd_plan(cli: &Cli, args: &cli::PlanArgs, output: &dyn Output) -> Result<()> {
    let (config, _) = load_or_default(cli.config.as_deref())?;
    let now = SystemClock.now();
    let hour = args.hour.unwrap_or_else(|| hour_of(&now));
    let bucket = TimeBucket::from_hour(hour)?;

    let sample = args
        .brightness
        .map(|b| LightingAnalyzer::new().analyze_luma(&[b], now))
        .transpose()?;
    let plan = ExposurePlanner::new(config.sensor).plan_with_source(
        hour,
        sample.as_ref(),
        config.manual.as_ref(),
    )?;

    output.plan(&PlanReport::new(hour, bucket, args.brightness, plan));
    Ok(())
}

fn cmd_read_metadata(args: &cli::ReadMetadataArgs, output: &dyn Output) -> Result<()> {
    let record = MetadataRecorder::new().read(&args.image, args.source)?;
    output.record(&record);
    Ok(())
}

fn cmd_backends(cli: &Cli, output: &dyn Output) -> Result<()> {
    let (config, _) = load_or_default(cli.config.as_deref())?;
    output.backends(&BackendStatus::from_probe(probe_tools(&config.backends)));
    Ok(())
}

fn cmd_version(output: &dyn Output) {
    output.version_info(&VersionInfo {
        version: build_info::VERSION,
        git_sha: build_info::git_sha(),
        build_timestamp: build_info::build_timestamp(),
        rustc: build_info::rustc_semver(),
        target: build_info::target(),
    });
}

fn cmd_completions(args: &cli::CompletionsArgs) {
    use clap::CommandFactory;
    clap_complete::generate(
        args.shell,
        &mut Cli::command(),
        "adaptcap",
        &mut io::stdout(),
    );
}
