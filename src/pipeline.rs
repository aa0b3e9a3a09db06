//! One top-level capture: plan, capture (or bracket), record, log.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::backend::{CaptureBackend, select_backend};
use crate::bracket::{BracketingController, bracket_path};
use crate::capture_log::{CaptureLog, LogSink, Outcome};
use crate::clock::{Clock, file_stamp, hour_of};
use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::exposure::{
    BrightnessBand, CaptureSettings, ExposurePlanner, LightingAnalyzer, LightingSample, TimeBucket,
};
use crate::metadata::{MetadataRecorder, sidecar_path};
use crate::record::{CaptureAttempt, CaptureRecord};

/// What happened to the preview measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Adaptive mode off, or a manual override made it irrelevant.
    Skipped,
    /// Preview measured.
    Measured { band: BrightnessBand, mean: f64 },
    /// No preview could be measured; time-of-day settings were used.
    Unavailable { reason: String },
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped => f.write_str("skipped"),
            Self::Measured { band, mean } => write!(f, "{band} (mean {mean:.1})"),
            Self::Unavailable { reason } => write!(f, "unavailable ({reason})"),
        }
    }
}

/// Where the capture record ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetadataStatus {
    Stored { path: PathBuf },
    Failed { reason: String },
}

/// Result of a successful invocation.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureOutcome {
    pub image_path: PathBuf,
    pub size_bytes: u64,
    pub analysis: AnalysisStatus,
    pub metadata: MetadataStatus,
    pub record: CaptureRecord,
}

/// Decision path accumulated for the log line.
#[derive(Debug, Default)]
struct Trail {
    bucket: Option<TimeBucket>,
    analysis: Option<AnalysisStatus>,
    manual: bool,
    backend: Option<String>,
}

impl Trail {
    fn describe(&self) -> String {
        let mut parts = vec![match (self.manual, self.bucket) {
            (true, _) => "manual".to_string(),
            (false, Some(bucket)) => format!("bucket={bucket}"),
            (false, None) => "bucket=?".to_string(),
        }];
        if let Some(analysis) = &self.analysis {
            parts.push(format!("analysis={analysis}"));
        }
        if let Some(backend) = &self.backend {
            parts.push(format!("backend={backend}"));
        }
        parts.join(" ")
    }
}

/// Runs capture invocations against a fixed configuration.
pub struct CapturePipeline<C, S> {
    config: CaptureConfig,
    clock: C,
    log: CaptureLog<S>,
    planner: ExposurePlanner,
    analyzer: LightingAnalyzer,
    recorder: MetadataRecorder,
}

impl<C: Clock, S: LogSink> CapturePipeline<C, S> {
    pub fn new(config: CaptureConfig, clock: C, sink: S) -> Self {
        let planner = ExposurePlanner::new(config.sensor);
        Self {
            config,
            clock,
            log: CaptureLog::new(sink),
            planner,
            analyzer: LightingAnalyzer::new(),
            recorder: MetadataRecorder::new(),
        }
    }

    pub const fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Perform one capture with the first available backend in `candidates`.
    ///
    /// Exactly one capture log line is appended, on success or failure.
    #[instrument(skip_all, fields(output_dir = %self.config.output_dir.display()))]
    pub fn run<B: CaptureBackend>(&self, candidates: &[B]) -> Result<CaptureOutcome> {
        let started = self.clock.now();
        let mut trail = Trail {
            bucket: TimeBucket::from_hour(hour_of(&started)).ok(),
            manual: self.config.manual.is_some(),
            ..Trail::default()
        };

        let result = self.run_inner(started, candidates, &mut trail);

        let (outcome, message) = match &result {
            Ok(done) => (
                Outcome::Success,
                format!(
                    "SUCCESS {} ({:.1} KB) {} settings: {}",
                    file_name(&done.image_path),
                    done.size_bytes as f64 / 1024.0,
                    trail.describe(),
                    done.record.attempt.settings
                ),
            ),
            Err(e) => (
                Outcome::Failure,
                format!("FAILURE {} error: {e}", trail.describe()),
            ),
        };
        if let Err(e) = self.log.append(started, outcome, &message) {
            warn!(error = %e, "Could not append to capture log");
        }
        result
    }

    fn run_inner<B: CaptureBackend>(
        &self,
        started: chrono::NaiveDateTime,
        candidates: &[B],
        trail: &mut Trail,
    ) -> Result<CaptureOutcome> {
        let backend = select_backend(candidates)?;
        trail.backend = Some(backend.id().to_string());

        let dir = &self.config.output_dir;
        ensure_writable(dir)?;

        let bracket_frames = if self.config.brackets() {
            self.config.bracket_offsets.len()
        } else {
            0
        };
        let final_path = free_capture_path(dir, &file_stamp(&started), bracket_frames)?;

        let manual = self.config.manual.as_ref();
        let (sample, analysis) = if self.config.adaptive && manual.is_none() {
            match self.measure(backend, dir, started) {
                Ok(sample) => {
                    let status = AnalysisStatus::Measured {
                        band: sample.band(),
                        mean: sample.mean_brightness,
                    };
                    (Some(sample), status)
                }
                Err(e) => {
                    warn!(error = %e, "Lighting analysis unavailable, using time-of-day settings");
                    (
                        None,
                        AnalysisStatus::Unavailable {
                            reason: e.to_string(),
                        },
                    )
                }
            }
        } else {
            (None, AnalysisStatus::Skipped)
        };
        trail.analysis = Some(analysis.clone());

        let plan = self
            .planner
            .plan_with_source(hour_of(&started), sample.as_ref(), manual)?;
        info!(settings = %plan.settings, source = %plan.source, "Planned capture");

        let record = if self.config.brackets() {
            BracketingController::new(self.config.bracket_offsets.clone(), self.config.sensor)
                .capture_bracket(
                    &plan.settings,
                    sample.as_ref(),
                    backend,
                    &final_path,
                    started,
                    self.config.capture_timeout_ms,
                )?
                .into_record(started, plan.source, self.config.output)
        } else {
            let attempt =
                self.single_capture(backend, &plan.settings, sample, &final_path, started)?;
            CaptureRecord {
                timestamp: started,
                plan: plan.source,
                output: self.config.output,
                attempt,
                discarded: Vec::new(),
            }
        };

        let metadata = match self.recorder.record(&record, self.config.metadata) {
            Ok(path) => MetadataStatus::Stored { path },
            Err(e) => {
                warn!(error = %e, "Metadata could not be stored, image kept");
                MetadataStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let size_bytes = std::fs::metadata(&final_path)?.len();
        Ok(CaptureOutcome {
            image_path: final_path,
            size_bytes,
            analysis,
            metadata,
            record,
        })
    }

    /// Take a preview into a temporary file and measure it.
    fn measure<B: CaptureBackend>(
        &self,
        backend: &B,
        dir: &Path,
        taken_at: chrono::NaiveDateTime,
    ) -> Result<LightingSample> {
        let frame = tempfile::Builder::new()
            .prefix(".adaptcap_preview_")
            .suffix(".jpg")
            .tempfile_in(dir)
            .map_err(|e| CaptureError::AnalysisUnavailable(format!("preview file: {e}")))?;
        backend.preview(frame.path(), self.config.preview_timeout_ms)?;
        let sample = self.analyzer.analyze_file(frame.path(), taken_at)?;
        debug!(mean = sample.mean_brightness, band = %sample.band(), "Preview measured");
        Ok(sample)
    }

    fn single_capture<B: CaptureBackend>(
        &self,
        backend: &B,
        settings: &CaptureSettings,
        sample: Option<LightingSample>,
        final_path: &Path,
        taken_at: chrono::NaiveDateTime,
    ) -> Result<CaptureAttempt> {
        let mut attempt = backend
            .capture(settings, final_path, self.config.capture_timeout_ms)
            .with_lighting(sample);

        if !attempt.success {
            let err = attempt.failure.as_ref().map_or_else(
                || CaptureError::Other("capture failed without a reason".to_string()),
                |f| f.to_error(backend.id(), final_path),
            );
            return Err(err);
        }

        match self.analyzer.analyze_file(final_path, taken_at) {
            Ok(result) => attempt.result_analysis = Some(result),
            Err(e) => warn!(error = %e, "Captured image could not be analysed"),
        }
        Ok(attempt)
    }
}

/// Create `dir` if needed and prove a file can be written there.
pub fn ensure_writable(dir: &Path) -> Result<()> {
    let unwritable = |e: std::io::Error| CaptureError::DirectoryUnwritable {
        path: dir.display().to_string(),
        reason: e.to_string(),
    };
    std::fs::create_dir_all(dir).map_err(unwritable)?;
    tempfile::tempfile_in(dir).map_err(unwritable)?;
    Ok(())
}

/// Highest numeric suffix tried before giving up on a timestamp.
const MAX_NAME_SUFFIX: u32 = 99;

/// Pick `captured_<stamp>.jpg` in `dir`, or `captured_<stamp>_<n>.jpg` when
/// that image, its sidecar, or one of its `bracket_frames` frame paths is
/// already taken. Files from earlier captures are never reused.
///
/// # Errors
///
/// Fails with [`CaptureError::Io`] if every suffix up to the limit is taken.
pub fn free_capture_path(dir: &Path, stamp: &str, bracket_frames: usize) -> Result<PathBuf> {
    let taken = |path: &Path| path.symlink_metadata().is_ok();
    for n in 0..=MAX_NAME_SUFFIX {
        let name = if n == 0 {
            format!("captured_{stamp}.jpg")
        } else {
            format!("captured_{stamp}_{n}.jpg")
        };
        let candidate = dir.join(name);
        let clash = taken(&candidate)
            || taken(&sidecar_path(&candidate))
            || (0..bracket_frames).any(|i| taken(&bracket_path(&candidate, i)));
        if !clash {
            return Ok(candidate);
        }
        debug!(path = %candidate.display(), "Capture name already in use");
    }
    Err(CaptureError::Io(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("no free file name for captured_{stamp}.jpg in {}", dir.display()),
    )))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
