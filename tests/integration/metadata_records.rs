//! Stored capture records and reading them back.

use adaptcap::backend::mock::MockBackend;
use adaptcap::capture_log::MemorySink;
use adaptcap::clock::FixedClock;
use adaptcap::config::CaptureConfig;
use adaptcap::error::CaptureError;
use adaptcap::metadata::{MetadataMode, MetadataRecorder, MetadataSource, sidecar_path};
use adaptcap::pipeline::{CaptureOutcome, CapturePipeline};

use crate::common::fixtures::Workspace;
use crate::common::init_test_logging;

fn capture(ws: &Workspace, metadata: MetadataMode) -> CaptureOutcome {
    let config = CaptureConfig {
        output_dir: ws.output_dir(),
        metadata,
        ..CaptureConfig::default()
    };
    let pipeline = CapturePipeline::new(config, FixedClock::at_hour(18), MemorySink::new());
    pipeline
        .run(&[MockBackend::new("mock").with_preview(70)])
        .unwrap()
}

#[test]
fn embedded_record_survives_in_a_decodable_jpeg() {
    init_test_logging();
    let ws = Workspace::new();
    let outcome = capture(&ws, MetadataMode::Embedded);

    let image = image::open(&outcome.image_path).unwrap();
    assert!(image.width() > 0);
    assert!(!sidecar_path(&outcome.image_path).exists());

    let recorder = MetadataRecorder::new();
    for source in [MetadataSource::Embedded, MetadataSource::Auto] {
        let read = recorder.read(&outcome.image_path, source).unwrap();
        assert_eq!(read, outcome.record, "{source:?}");
    }
    assert!(outcome.record.attempt.lighting.is_some());
    assert!(outcome.record.attempt.result_analysis.is_some());
}

#[test]
fn auto_falls_back_to_sidecar() {
    init_test_logging();
    let ws = Workspace::new();
    let outcome = capture(&ws, MetadataMode::Sidecar);

    let recorder = MetadataRecorder::new();
    let read = recorder
        .read(&outcome.image_path, MetadataSource::Auto)
        .unwrap();
    assert_eq!(read, outcome.record);
    assert!(matches!(
        recorder.read(&outcome.image_path, MetadataSource::Embedded),
        Err(CaptureError::Metadata(_))
    ));
}

#[test]
fn records_are_never_overwritten() {
    init_test_logging();
    let ws = Workspace::new();
    let outcome = capture(&ws, MetadataMode::Embedded);

    let recorder = MetadataRecorder::new();
    let before = std::fs::read(&outcome.image_path).unwrap();
    assert!(
        recorder
            .record(&outcome.record, MetadataMode::Embedded)
            .is_err()
    );
    assert_eq!(std::fs::read(&outcome.image_path).unwrap(), before);
}

#[test]
fn image_without_record_reports_metadata_error() {
    let ws = Workspace::new();
    let plain = ws.frame("plain.jpg", 128);
    let err = MetadataRecorder::new()
        .read(&plain, MetadataSource::Auto)
        .unwrap_err();
    assert!(matches!(err, CaptureError::Metadata(_)), "{err}");
}

#[test]
fn record_json_names_plan_and_backend() {
    init_test_logging();
    let ws = Workspace::new();
    let outcome = capture(&ws, MetadataMode::Sidecar);

    let text = std::fs::read_to_string(sidecar_path(&outcome.image_path)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["timestamp"], "2024-06-21T18:00:00");
    assert_eq!(json["plan"]["source"], "time_of_day");
    assert_eq!(json["plan"]["bucket"], "dusk");
    assert_eq!(json["plan"]["band"], "dark");
    assert_eq!(json["attempt"]["backend"], "mock");
    assert_eq!(json["attempt"]["success"], true);
    assert!(json.get("discarded").is_none());
}
