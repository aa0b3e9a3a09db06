//! Exposure bracketing: capture at several EV offsets and keep the best frame.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info, instrument, warn};

use crate::backend::{CaptureBackend, OutputOptions};
use crate::error::{CaptureError, Result, ResultExt};
use crate::exposure::{CaptureSettings, LightingAnalyzer, LightingSample, PlanSource, SensorLimits};
use crate::record::{CaptureAttempt, CaptureRecord};

/// EV offsets used when none are configured.
pub const DEFAULT_OFFSETS: [f64; 3] = [-1.0, 0.0, 1.0];

/// Mid-grey target for scoring.
const TARGET_MEAN: f64 = 128.0;
/// Weight of contrast (spread) in the score.
const SPREAD_WEIGHT: f64 = 0.1;
/// Points lost per unit share of pixels clipped at either end.
const CLIPPING_PENALTY: f64 = 100.0;

/// Score a frame: closeness to mid-grey plus a small contrast bonus, minus
/// a penalty for crushed shadows and blown highlights.
pub fn score(sample: &LightingSample) -> f64 {
    100.0 - (sample.mean_brightness - TARGET_MEAN).abs() + SPREAD_WEIGHT * sample.brightness_spread
        - CLIPPING_PENALTY * (sample.clipped_shadows + sample.clipped_highlights)
}

/// Path of bracket frame `index` next to `final_path`.
pub fn bracket_path(final_path: &Path, index: usize) -> PathBuf {
    let stem = final_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    final_path.with_file_name(format!("{stem}_bracket_{index}.jpg"))
}

/// Selected frame plus the attempts that lost.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketOutcome {
    pub selected: CaptureAttempt,
    pub discarded: Vec<CaptureAttempt>,
}

impl BracketOutcome {
    pub fn into_record(
        self,
        timestamp: NaiveDateTime,
        plan: PlanSource,
        output: OutputOptions,
    ) -> CaptureRecord {
        CaptureRecord {
            timestamp,
            plan,
            output,
            attempt: self.selected,
            discarded: self.discarded,
        }
    }
}

/// Drives a backend through a fixed set of EV offsets.
#[derive(Debug, Clone)]
pub struct BracketingController {
    offsets: Vec<f64>,
    limits: SensorLimits,
    analyzer: LightingAnalyzer,
}

impl BracketingController {
    #[must_use]
    pub fn new(offsets: Vec<f64>, limits: SensorLimits) -> Self {
        Self {
            offsets,
            limits,
            analyzer: LightingAnalyzer::new(),
        }
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// Capture one frame per offset, keep the best at `final_path`.
    ///
    /// Frames are taken strictly one after another. A failed offset is not
    /// retried. Losing frames are deleted.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::BracketExhausted`] if no offset produced a
    /// readable frame, or an error if the winner cannot be moved to
    /// `final_path`. No bracket frame is left behind either way.
    #[instrument(skip_all, fields(backend = backend.id(), base = %base, offsets = ?self.offsets))]
    pub fn capture_bracket<B: CaptureBackend + ?Sized>(
        &self,
        base: &CaptureSettings,
        lighting: Option<&LightingSample>,
        backend: &B,
        final_path: &Path,
        taken_at: NaiveDateTime,
        timeout_ms: u64,
    ) -> Result<BracketOutcome> {
        let mut attempts = Vec::with_capacity(self.offsets.len());
        let mut best: Option<(usize, f64)> = None;

        for (index, &ev) in self.offsets.iter().enumerate() {
            let settings = base.with_ev_offset(ev, &self.limits);
            let path = bracket_path(final_path, index);
            debug!(index, ev, %settings, "Capturing bracket frame");

            let mut attempt = backend
                .capture(&settings, &path, timeout_ms)
                .with_lighting(lighting.cloned())
                .with_ev_offset(ev);

            if attempt.success {
                match self.analyzer.analyze_file(&path, taken_at) {
                    Ok(sample) => {
                        let s = score(&sample);
                        debug!(index, ev, mean = sample.mean_brightness, score = s, "Scored bracket frame");
                        if best.is_none_or(|(_, top)| s > top) {
                            best = Some((attempts.len(), s));
                        }
                        attempt.result_analysis = Some(sample);
                    }
                    Err(e) => {
                        warn!(index, error = %e, "Bracket frame unreadable");
                        remove_file(&path);
                        attempt.mark_unreadable(e.to_string());
                    }
                }
            } else if let Some(failure) = &attempt.failure {
                warn!(index, ev, %failure, "Bracket frame failed, moving on");
            }
            attempts.push(attempt);
        }

        let Some((winner, top)) = best else {
            return Err(CaptureError::BracketExhausted {
                attempts: attempts.len(),
            });
        };

        let mut selected = attempts.remove(winner);
        let kept = selected
            .file_path
            .take()
            .map_or(Ok(()), |src| keep_frame(&src, final_path));

        for attempt in &mut attempts {
            if let Some(path) = attempt.file_path.take() {
                remove_file(&path);
            }
        }
        kept?;
        selected.file_path = Some(final_path.to_path_buf());

        info!(
            ev = selected.ev_offset,
            score = top,
            settings = %selected.settings,
            "Selected best bracket frame"
        );
        Ok(BracketOutcome {
            selected,
            discarded: attempts,
        })
    }
}

/// Move the winning frame to `final_path`, never over an existing file.
/// On failure the frame is deleted.
fn keep_frame(src: &Path, final_path: &Path) -> Result<()> {
    let result = if final_path.symlink_metadata().is_ok() {
        Err(CaptureError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists", final_path.display()),
        )))
    } else {
        std::fs::rename(src, final_path)
            .with_context(|| format!("keeping bracket frame {}", src.display()))
    };
    if result.is_err() {
        remove_file(src);
    }
    result
}

fn remove_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Could not delete bracket frame");
        }
    }
}
