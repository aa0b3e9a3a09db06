//! Robot mode JSON output implementation.

use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::error::CaptureError;
use crate::pipeline::CaptureOutcome;
use crate::record::CaptureRecord;

use super::{BackendStatus, Output, PlanReport, RobotFormat, VersionInfo};

/// JSON output implementation for scripts and schedulers.
///
/// Results go to stdout, errors to stderr, one JSON document per call.
#[derive(Debug, Clone, Copy)]
pub struct RobotOutput {
    format: RobotFormat,
}

impl RobotOutput {
    #[instrument]
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    /// Serialize `data` in the configured format.
    pub fn render<T: Serialize + ?Sized>(&self, data: &T) -> serde_json::Result<String> {
        match self.format {
            RobotFormat::Json => serde_json::to_string_pretty(data),
            RobotFormat::JsonCompact => serde_json::to_string(data),
        }
    }

    /// Output any serializable data as JSON to stdout.
    fn output_json<T: Serialize + ?Sized>(&self, data: &T) {
        match self.render(data) {
            Ok(json) => {
                trace!(json_len = json.len(), "JSON serialized");
                println!("{json}");
            }
            Err(e) => warn!(error = %e, "Could not serialize output"),
        }
    }
}

/// JSON body printed for a failed command.
pub fn error_json(error: &CaptureError) -> serde_json::Value {
    serde_json::json!({
        "error": true,
        "message": error.to_string(),
        "suggestion": error.suggestion(),
        "recoverable": error.is_user_recoverable(),
        "exit_code": error.exit_code(),
    })
}

impl Output for RobotOutput {
    #[instrument(skip(self))]
    fn success(&self, message: &str) {
        self.output_json(&serde_json::json!({
            "success": true,
            "message": message
        }));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &CaptureError) {
        debug!(error = %error, "Robot: error");
        match self.render(&error_json(error)) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => warn!(error = %e, "Could not serialize error"),
        }
    }

    #[instrument(skip(self))]
    fn warning(&self, message: &str) {
        self.output_json(&serde_json::json!({
            "warning": true,
            "message": message
        }));
    }

    #[instrument(skip(self))]
    fn info(&self, message: &str) {
        self.output_json(&serde_json::json!({
            "info": true,
            "message": message
        }));
    }

    #[instrument(skip_all)]
    fn capture_outcome(&self, outcome: &CaptureOutcome) {
        self.output_json(outcome);
    }

    #[instrument(skip_all)]
    fn plan(&self, report: &PlanReport) {
        self.output_json(report);
    }

    #[instrument(skip_all)]
    fn record(&self, record: &CaptureRecord) {
        self.output_json(record);
    }

    #[instrument(skip_all, fields(count = backends.len()))]
    fn backends(&self, backends: &[BackendStatus]) {
        self.output_json(backends);
    }

    fn version_info(&self, info: &VersionInfo) {
        self.output_json(info);
    }
}
