//! Concrete capture settings and the sensor bounds they must respect.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};

/// White balance mode passed to the capture tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WhiteBalance {
    /// Automatic white balance.
    #[default]
    Auto,
    /// Fixed daylight preset.
    Daylight,
    /// Fixed overcast preset.
    Cloudy,
    /// Manual colour gains (see [`WhiteBalance::CUSTOM_GAINS`]).
    Custom,
}

impl WhiteBalance {
    /// Red/blue gains used when the tool is asked for a custom balance.
    pub const CUSTOM_GAINS: (f32, f32) = (1.5, 2.5);

    /// Lowercase name as written in configs and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Daylight => "daylight",
            Self::Cloudy => "cloudy",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for WhiteBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported ISO and exposure-time range of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorLimits {
    pub min_iso: u32,
    pub max_iso: u32,
    pub min_exposure_us: u32,
    pub max_exposure_us: u32,
}

impl Default for SensorLimits {
    fn default() -> Self {
        Self {
            min_iso: 100,
            max_iso: 1600,
            min_exposure_us: 100,
            max_exposure_us: 10_000_000,
        }
    }
}

impl SensorLimits {
    /// Clamp an ISO value into the supported range.
    #[must_use]
    pub fn clamp_iso(&self, iso: f64) -> u32 {
        clamp_round(iso, self.min_iso, self.max_iso)
    }

    /// Clamp an exposure time (µs) into the supported range.
    #[must_use]
    pub fn clamp_exposure(&self, exposure_us: f64) -> u32 {
        clamp_round(exposure_us, self.min_exposure_us, self.max_exposure_us)
    }

    /// Check the limits themselves are coherent.
    pub fn validate(&self) -> Result<()> {
        if self.min_iso == 0 || self.min_iso > self.max_iso {
            return Err(CaptureError::ConfigInvalid(format!(
                "sensor ISO range {}-{} is empty or starts at 0",
                self.min_iso, self.max_iso
            )));
        }
        if self.min_exposure_us == 0 || self.min_exposure_us > self.max_exposure_us {
            return Err(CaptureError::ConfigInvalid(format!(
                "sensor exposure range {}-{} µs is empty or starts at 0",
                self.min_exposure_us, self.max_exposure_us
            )));
        }
        Ok(())
    }

    /// True if both ISO and exposure of `settings` lie inside the limits.
    #[must_use]
    pub fn contains(&self, settings: &CaptureSettings) -> bool {
        (self.min_iso..=self.max_iso).contains(&settings.iso)
            && (self.min_exposure_us..=self.max_exposure_us).contains(&settings.exposure_us)
    }
}

fn clamp_round(value: f64, min: u32, max: u32) -> u32 {
    if value.is_nan() {
        return min;
    }
    value.round().clamp(f64::from(min), f64::from(max)) as u32
}

/// Fully concrete exposure parameters for one capture attempt.
///
/// Values are fixed at construction. Deriving bracket variants goes through
/// [`CaptureSettings::with_ev_offset`], which returns a new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    exposure_us: u32,
    iso: u32,
    white_balance: WhiteBalance,
    ev_compensation: f64,
}

impl CaptureSettings {
    /// Build settings, rejecting a zero exposure time.
    pub fn new(
        exposure_us: u32,
        iso: u32,
        white_balance: WhiteBalance,
        ev_compensation: f64,
    ) -> Result<Self> {
        if exposure_us == 0 {
            return Err(CaptureError::ConfigInvalid(
                "exposure time must be greater than 0 µs".to_string(),
            ));
        }
        if !ev_compensation.is_finite() {
            return Err(CaptureError::ConfigInvalid(format!(
                "EV compensation must be finite, got {ev_compensation}"
            )));
        }
        Ok(Self {
            exposure_us,
            iso,
            white_balance,
            ev_compensation,
        })
    }

    /// Table constructor for compile-time recipes.
    pub(crate) const fn recipe(
        exposure_us: u32,
        iso: u32,
        white_balance: WhiteBalance,
        ev_compensation: f64,
    ) -> Self {
        Self {
            exposure_us,
            iso,
            white_balance,
            ev_compensation,
        }
    }

    pub const fn exposure_us(&self) -> u32 {
        self.exposure_us
    }

    pub const fn iso(&self) -> u32 {
        self.iso
    }

    pub const fn white_balance(&self) -> WhiteBalance {
        self.white_balance
    }

    pub const fn ev_compensation(&self) -> f64 {
        self.ev_compensation
    }

    /// Scale exposure and ISO and replace EV, clamping to `limits`.
    pub(crate) fn adjusted(
        &self,
        exposure_factor: f64,
        iso_factor: f64,
        ev_compensation: f64,
        limits: &SensorLimits,
    ) -> Self {
        Self {
            exposure_us: limits.clamp_exposure(f64::from(self.exposure_us) * exposure_factor),
            iso: limits.clamp_iso(f64::from(self.iso) * iso_factor),
            white_balance: self.white_balance,
            ev_compensation,
        }
    }

    /// Derive the settings for an EV offset (`2^ev` times the light).
    ///
    /// Exposure time absorbs as much of the factor as the sensor allows; the
    /// remainder goes to ISO. An offset of 0 returns identical settings.
    #[must_use]
    pub fn with_ev_offset(&self, ev: f64, limits: &SensorLimits) -> Self {
        let factor = 2f64.powf(ev);
        let exposure_us = limits.clamp_exposure(f64::from(self.exposure_us) * factor);
        let applied = f64::from(exposure_us) / f64::from(self.exposure_us);
        let iso = limits.clamp_iso(f64::from(self.iso) * (factor / applied));
        Self {
            exposure_us,
            iso,
            white_balance: self.white_balance,
            ev_compensation: self.ev_compensation,
        }
    }
}

impl std::fmt::Display for CaptureSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "exposure={}us iso={} wb={} ev={:+.1}",
            self.exposure_us, self.iso, self.white_balance, self.ev_compensation
        )
    }
}
