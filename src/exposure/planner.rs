//! Combines time-of-day recipes, optical measurements and manual overrides
//! into one concrete [`CaptureSettings`].

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::lighting::{BrightnessBand, LightingSample};
use super::settings::{CaptureSettings, SensorLimits, WhiteBalance};
use super::time_of_day::TimeBucket;
use crate::error::{CaptureError, Result};

/// Operator-supplied exposure parameters that bypass all inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub exposure_us: u32,
    pub iso: u32,
    #[serde(default)]
    pub white_balance: WhiteBalance,
    #[serde(default)]
    pub ev_compensation: f64,
}

impl ManualOverride {
    /// The override as capture settings, unchanged.
    pub fn settings(&self) -> Result<CaptureSettings> {
        CaptureSettings::new(
            self.exposure_us,
            self.iso,
            self.white_balance,
            self.ev_compensation,
        )
    }

    /// Reject overrides the sensor cannot honour.
    ///
    /// Overrides are used verbatim by the planner, so range problems are
    /// reported here instead of being clamped away.
    pub fn validate(&self, limits: &SensorLimits) -> Result<()> {
        let settings = self.settings()?;
        if !limits.contains(&settings) {
            return Err(CaptureError::ConfigInvalid(format!(
                "manual override ({settings}) is outside sensor limits ISO {}-{}, exposure {}-{} µs",
                limits.min_iso, limits.max_iso, limits.min_exposure_us, limits.max_exposure_us
            )));
        }
        Ok(())
    }
}

/// Where the planned settings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PlanSource {
    /// Manual override, used verbatim.
    Manual,
    /// Time-of-day recipe, optionally refined by a brightness band.
    TimeOfDay {
        bucket: TimeBucket,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        band: Option<BrightnessBand>,
    },
}

impl std::fmt::Display for PlanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::TimeOfDay { bucket, band: None } => write!(f, "bucket={bucket}"),
            Self::TimeOfDay {
                bucket,
                band: Some(band),
            } => write!(f, "bucket={bucket} band={band}"),
        }
    }
}

/// Planned settings together with the decision that produced them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub settings: CaptureSettings,
    pub source: PlanSource,
}

/// Produces concrete settings for a capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExposurePlanner {
    limits: SensorLimits,
}

impl ExposurePlanner {
    #[must_use]
    pub const fn new(limits: SensorLimits) -> Self {
        Self { limits }
    }

    pub const fn limits(&self) -> &SensorLimits {
        &self.limits
    }

    /// Settings for `hour`, refined by `sample`, unless `manual` is given.
    pub fn plan(
        &self,
        hour: u32,
        sample: Option<&LightingSample>,
        manual: Option<&ManualOverride>,
    ) -> Result<CaptureSettings> {
        self.plan_with_source(hour, sample, manual)
            .map(|plan| plan.settings)
    }

    /// Like [`plan`](Self::plan) but also reports the decision path.
    #[instrument(skip(self, sample, manual), fields(has_sample = sample.is_some(), manual = manual.is_some()))]
    pub fn plan_with_source(
        &self,
        hour: u32,
        sample: Option<&LightingSample>,
        manual: Option<&ManualOverride>,
    ) -> Result<Plan> {
        if let Some(manual) = manual {
            debug!("Manual override wins");
            return Ok(Plan {
                settings: manual.settings()?,
                source: PlanSource::Manual,
            });
        }

        let bucket = TimeBucket::from_hour(hour)?;
        let recipe = self.clamped(bucket.recipe());

        let Some(sample) = sample else {
            debug!(%bucket, settings = %recipe, "Time-of-day recipe");
            return Ok(Plan {
                settings: recipe,
                source: PlanSource::TimeOfDay { bucket, band: None },
            });
        };

        let band = sample.band();
        let settings = self.adjust(&recipe, band);
        debug!(%bucket, %band, mean = sample.mean_brightness, %settings, "Adjusted recipe");
        Ok(Plan {
            settings,
            source: PlanSource::TimeOfDay {
                bucket,
                band: Some(band),
            },
        })
    }

    /// Apply a brightness band's adjustment to `base`.
    pub fn adjust(&self, base: &CaptureSettings, band: BrightnessBand) -> CaptureSettings {
        let adj = band.adjustment();
        let ev = toward_zero(base.ev_compensation(), adj.ev_toward_zero);
        base.adjusted(adj.exposure_factor, adj.iso_factor, ev, &self.limits)
    }

    fn clamped(&self, settings: CaptureSettings) -> CaptureSettings {
        settings.adjusted(1.0, 1.0, settings.ev_compensation(), &self.limits)
    }
}

fn toward_zero(ev: f64, step: f64) -> f64 {
    if ev > 0.0 {
        (ev - step).max(0.0)
    } else if ev < 0.0 {
        (ev + step).min(0.0)
    } else {
        ev
    }
}
