//! Config files driving capture runs.

use clap::Parser;
use serde_json::json;

use adaptcap::backend::CaptureTool;
use adaptcap::backend::mock::MockBackend;
use adaptcap::capture_log::FileSink;
use adaptcap::cli::{Cli, Commands};
use adaptcap::clock::FixedClock;
use adaptcap::config::{CaptureConfig, load_config, load_or_default, save_config};
use adaptcap::error::CaptureError;
use adaptcap::metadata::MetadataMode;
use adaptcap::pipeline::CapturePipeline;

use crate::common::env::{EnvGuard, with_config_env};
use crate::common::fixtures::Workspace;
use crate::common::init_test_logging;

#[test]
fn relative_paths_resolve_against_config_dir() {
    init_test_logging();
    let ws = Workspace::new();
    let path = ws.write_config(
        "adaptcap.toml",
        r#"
output_dir = "incoming"
log_file = "logs/camera.log"
adaptive = false
metadata = "sidecar"
"#,
    );

    let config = load_config(&path).unwrap();
    let base = ws.path().canonicalize().unwrap();
    assert_eq!(config.output_dir, base.join("incoming"));
    assert_eq!(config.log_path(), base.join("logs").join("camera.log"));

    let sink = FileSink::new(config.log_path());
    let pipeline = CapturePipeline::new(config, FixedClock::at_hour(10), sink);
    let outcome = pipeline.run(&[MockBackend::new("mock")]).unwrap();

    assert!(outcome.image_path.starts_with(base.join("incoming")));
    let log = std::fs::read_to_string(base.join("logs").join("camera.log")).unwrap();
    assert_eq!(log.lines().count(), 1);
}

#[test]
fn yaml_manual_override_is_used_verbatim() {
    init_test_logging();
    let ws = Workspace::new();
    let path = ws.write_config(
        "adaptcap.yaml",
        "output_dir: shots\nmanual:\n  exposure_us: 12000\n  iso: 320\n  white_balance: cloudy\n  ev_compensation: -0.5\n",
    );
    let config = load_config(&path).unwrap();
    let pipeline = CapturePipeline::new(config, FixedClock::at_hour(23), FileSink::new(ws.path().join("c.log")));
    let mock = [MockBackend::new("mock").with_preview(10)];

    let outcome = pipeline.run(&mock).unwrap();

    let settings = outcome.record.attempt.settings;
    assert_eq!(settings.exposure_us(), 12_000);
    assert_eq!(settings.iso(), 320);
    assert!((settings.ev_compensation() + 0.5).abs() < f64::EPSILON);
    // Manual captures never take a preview.
    assert_eq!(mock[0].operations().len(), 1);
    assert_eq!(
        serde_json::to_value(outcome.record.plan).unwrap(),
        json!({"source": "manual"})
    );
}

#[test]
fn invalid_configs_are_rejected_with_config_exit_code() {
    let ws = Workspace::new();
    for (name, content) in [
        ("bad_quality.toml", "[output]\nquality = 150\n"),
        ("bad_offsets.toml", "bracket_offsets = []\n"),
        ("repeated_offsets.toml", "bracket_offsets = [0.0, 0.0, 0.0]\n"),
        ("bad_manual.toml", "[manual]\nexposure_us = 0\niso = 100\n"),
        ("bad_syntax.yaml", "adaptive: [\n"),
    ] {
        let path = ws.write_config(name, content);
        let err = load_config(&path).unwrap_err();
        assert_eq!(err.exit_code(), 78, "{name}: {err}");
    }
}

#[test]
fn missing_explicit_config_is_an_error() {
    let err = load_or_default(Some(std::path::Path::new("/nonexistent/adaptcap.toml"))).unwrap_err();
    assert!(matches!(err, CaptureError::ConfigNotFound { .. }));
}

#[test]
fn saved_config_loads_back() {
    let ws = Workspace::new();
    let config = CaptureConfig {
        output_dir: ws.output_dir(),
        metadata: MetadataMode::Sidecar,
        backends: vec![CaptureTool::Raspistill, CaptureTool::RpicamStill],
        ..CaptureConfig::default()
    };
    let path = ws.path().join("saved.yaml");
    save_config(&config, &path).unwrap();

    let loaded = load_config(&path).unwrap();
    assert_eq!(loaded.metadata, MetadataMode::Sidecar);
    assert_eq!(loaded.backends, config.backends);
}

#[test]
fn cli_reads_config_path_from_env() {
    let _guard = with_config_env("/etc/adaptcap/site.toml");
    let cli = Cli::try_parse_from(["adaptcap", "backends"]).unwrap();
    assert_eq!(
        cli.config.as_deref(),
        Some(std::path::Path::new("/etc/adaptcap/site.toml"))
    );
    assert!(matches!(cli.command, Some(Commands::Backends)));
}

#[test]
fn cli_format_from_env() {
    let _guard = EnvGuard::set("ADAPTCAP_FORMAT", "json-compact");
    let cli = Cli::try_parse_from(["adaptcap", "version"]).unwrap();
    assert!(cli.use_json());
    assert!(cli.use_compact_json());
}
