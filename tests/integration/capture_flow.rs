//! End-to-end capture runs against the mock backend.

use adaptcap::backend::BoxedBackend;
use adaptcap::backend::mock::{MockBackend, MockOutcome, Operation};
use adaptcap::capture_log::{FileSink, MemorySink};
use adaptcap::clock::FixedClock;
use adaptcap::config::CaptureConfig;
use adaptcap::error::CaptureError;
use adaptcap::exposure::{BrightnessBand, PlanSource, TimeBucket, WhiteBalance};
use adaptcap::pipeline::{AnalysisStatus, CapturePipeline, MetadataStatus};

use crate::common::fixtures::Workspace;
use crate::common::init_test_logging;

fn config(ws: &Workspace, adaptive: bool) -> CaptureConfig {
    CaptureConfig {
        output_dir: ws.output_dir(),
        adaptive,
        ..CaptureConfig::default()
    }
}

#[test]
fn day_capture_without_preview_uses_recipe() {
    init_test_logging();
    let ws = Workspace::new();
    let sink = MemorySink::new();
    let pipeline = CapturePipeline::new(config(&ws, false), FixedClock::at_hour(12), sink.clone());
    let mock = [MockBackend::new("mock")];

    let outcome = pipeline.run(&mock).unwrap();

    assert_eq!(
        outcome.image_path,
        ws.output_dir().join("captured_20240621_120000.jpg")
    );
    assert!(outcome.image_path.is_file());
    assert!(outcome.size_bytes > 0);
    assert_eq!(outcome.analysis, AnalysisStatus::Skipped);

    let settings = mock[0].captured_settings();
    assert_eq!(settings.len(), 1);
    assert_eq!(settings[0].exposure_us(), 2_000);
    assert_eq!(settings[0].iso(), 100);
    assert_eq!(settings[0].white_balance(), WhiteBalance::Daylight);
    assert_eq!(
        outcome.record.plan,
        PlanSource::TimeOfDay {
            bucket: TimeBucket::Day,
            band: None
        }
    );

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("[2024-06-21 12:00:00] SUCCESS captured_20240621_120000.jpg"));
    assert!(lines[0].contains("bucket=day"));
}

#[test]
fn bright_preview_shortens_exposure() {
    init_test_logging();
    let ws = Workspace::new();
    let pipeline = CapturePipeline::new(config(&ws, true), FixedClock::at_hour(12), MemorySink::new());
    let mock = [MockBackend::new("mock").with_preview(230)];

    let outcome = pipeline.run(&mock).unwrap();

    match &outcome.analysis {
        AnalysisStatus::Measured { band, mean } => {
            assert_eq!(*band, BrightnessBand::Bright);
            assert!(*mean > 200.0);
        }
        other => panic!("expected a measurement, got {other:?}"),
    }
    assert_eq!(mock[0].captured_settings()[0].exposure_us(), 1_000);
    assert!(outcome.record.attempt.lighting.is_some());

    // Preview first, then exactly one capture; the preview file is gone.
    let ops = mock[0].operations();
    assert_eq!(ops.len(), 2);
    let Operation::Preview { path } = &ops[0] else {
        panic!("expected preview first, got {ops:?}");
    };
    assert!(!path.exists());
    assert_eq!(ws.captures(), vec![outcome.image_path.clone()]);
}

#[test]
fn missing_preview_degrades_to_time_of_day() {
    init_test_logging();
    let ws = Workspace::new();
    let sink = MemorySink::new();
    let pipeline = CapturePipeline::new(config(&ws, true), FixedClock::at_hour(22), sink.clone());
    // No preview luma configured: preview is unavailable.
    let mock = [MockBackend::new("mock")];

    let outcome = pipeline.run(&mock).unwrap();

    assert!(matches!(outcome.analysis, AnalysisStatus::Unavailable { .. }));
    let settings = mock[0].captured_settings()[0];
    assert_eq!(settings.exposure_us(), 30_000);
    assert_eq!(settings.iso(), 800);
    assert!(sink.lines()[0].contains("analysis=unavailable"));
}

#[test]
fn falls_back_to_next_available_backend() {
    init_test_logging();
    let ws = Workspace::new();
    let pipeline = CapturePipeline::new(config(&ws, false), FixedClock::at_hour(7), MemorySink::new());
    let backends: Vec<BoxedBackend> = vec![
        Box::new(MockBackend::unavailable("rpicam-still")),
        Box::new(MockBackend::new("raspistill")),
    ];

    let outcome = pipeline.run(&backends).unwrap();
    assert_eq!(outcome.record.attempt.backend, "raspistill");
}

#[test]
fn no_backend_fails_and_logs_once() {
    init_test_logging();
    let ws = Workspace::new();
    let sink = MemorySink::new();
    let pipeline = CapturePipeline::new(config(&ws, true), FixedClock::at_hour(3), sink.clone());
    let mock = [
        MockBackend::unavailable("rpicam-still"),
        MockBackend::unavailable("raspistill"),
    ];

    let err = pipeline.run(&mock).unwrap_err();

    assert!(matches!(err, CaptureError::NoBackendAvailable { .. }));
    assert_eq!(err.exit_code(), 3);
    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("FAILURE"));
    assert!(lines[0].contains("rpicam-still, raspistill"));
    assert!(ws.captures().is_empty());
}

#[test]
fn timed_out_capture_leaves_no_image() {
    init_test_logging();
    let ws = Workspace::new();
    let pipeline = CapturePipeline::new(config(&ws, false), FixedClock::at_hour(12), MemorySink::new());
    let mock = [MockBackend::new("mock").with_outcomes([MockOutcome::Timeout])];

    let err = pipeline.run(&mock).unwrap_err();

    assert!(matches!(err, CaptureError::CaptureTimeout { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(ws.captures().is_empty());
}

#[test]
fn rerun_in_same_second_never_touches_earlier_image() {
    init_test_logging();
    let ws = Workspace::new();
    let sink = MemorySink::new();
    let pipeline = CapturePipeline::new(config(&ws, false), FixedClock::at_hour(2), sink.clone());

    let first = pipeline.run(&[MockBackend::new("mock")]).unwrap();
    let earlier = std::fs::read(&first.image_path).unwrap();

    let failing = [MockBackend::new("mock").with_outcomes([MockOutcome::Failed])];
    pipeline.run(&failing).unwrap_err();
    assert_eq!(std::fs::read(&first.image_path).unwrap(), earlier);

    let second = pipeline.run(&[MockBackend::new("mock")]).unwrap();
    assert_ne!(second.image_path, first.image_path);
    assert_eq!(std::fs::read(&first.image_path).unwrap(), earlier);
    assert_eq!(ws.captures().len(), 2);
    assert_eq!(sink.lines().len(), 3);
}

#[test]
fn capture_log_file_accumulates_lines() {
    init_test_logging();
    let ws = Workspace::new();
    let log_path = ws.path().join("logs").join("capture.log");

    for hour in [6, 13] {
        let pipeline = CapturePipeline::new(
            config(&ws, false),
            FixedClock::at_hour(hour),
            FileSink::new(&log_path),
        );
        pipeline.run(&[MockBackend::new("mock")]).unwrap();
    }
    let pipeline = CapturePipeline::new(
        config(&ws, false),
        FixedClock::at_hour(20),
        FileSink::new(&log_path),
    );
    assert!(pipeline.run(&[MockBackend::unavailable("mock")]).is_err());

    let content = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("[2024-06-21 06:00:00] SUCCESS"));
    assert!(lines[0].contains("bucket=dawn"));
    assert!(lines[1].starts_with("[2024-06-21 13:00:00] SUCCESS"));
    assert!(lines[2].starts_with("[2024-06-21 20:00:00] FAILURE"));
    assert_eq!(ws.captures().len(), 2);
}

#[test]
fn metadata_status_reports_stored_path() {
    init_test_logging();
    let ws = Workspace::new();
    let pipeline = CapturePipeline::new(config(&ws, false), FixedClock::at_hour(12), MemorySink::new());
    let outcome = pipeline.run(&[MockBackend::new("mock")]).unwrap();

    assert_eq!(
        outcome.metadata,
        MetadataStatus::Stored {
            path: outcome.image_path.clone()
        }
    );
}
