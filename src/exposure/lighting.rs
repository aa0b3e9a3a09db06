//! Scene brightness measurement from a preview frame.

use std::path::Path;

use chrono::NaiveDateTime;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::error::{CaptureError, Result};

/// Luma below which a pixel counts as dark (lower third of the range).
const DARK_PIXEL_CUTOFF: u8 = 85;
/// Luma at or above which a pixel counts as bright (upper third).
const BRIGHT_PIXEL_CUTOFF: u8 = 170;

/// Brightness band of a measured scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrightnessBand {
    /// Mean < 50.
    VeryDark,
    /// Mean 50-99.
    Dark,
    /// Mean 100-180.
    Normal,
    /// Mean > 180.
    Bright,
}

/// How a band modifies the time-of-day recipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandAdjustment {
    /// Multiplier on exposure time.
    pub exposure_factor: f64,
    /// Multiplier on ISO.
    pub iso_factor: f64,
    /// Amount EV compensation moves toward 0.
    pub ev_toward_zero: f64,
}

impl BrightnessBand {
    /// Classify a mean brightness on the 0-255 scale.
    pub fn classify(mean: f64) -> Self {
        if mean < 50.0 {
            Self::VeryDark
        } else if mean < 100.0 {
            Self::Dark
        } else if mean <= 180.0 {
            Self::Normal
        } else {
            Self::Bright
        }
    }

    pub const fn adjustment(self) -> BandAdjustment {
        match self {
            Self::VeryDark => BandAdjustment {
                exposure_factor: 2.0,
                iso_factor: 2.0,
                ev_toward_zero: 0.0,
            },
            Self::Dark => BandAdjustment {
                exposure_factor: 1.25,
                iso_factor: 1.5,
                ev_toward_zero: 0.0,
            },
            Self::Normal => BandAdjustment {
                exposure_factor: 1.0,
                iso_factor: 1.0,
                ev_toward_zero: 0.0,
            },
            Self::Bright => BandAdjustment {
                exposure_factor: 0.5,
                iso_factor: 1.0,
                ev_toward_zero: 0.3,
            },
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryDark => "very_dark",
            Self::Dark => "dark",
            Self::Normal => "normal",
            Self::Bright => "bright",
        }
    }
}

impl std::fmt::Display for BrightnessBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Brightness statistics of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingSample {
    /// Mean luma, 0-255.
    pub mean_brightness: f64,
    /// Population standard deviation of luma.
    pub brightness_spread: f64,
    /// Share of pixels below 85.
    pub dark_fraction: f64,
    /// Share of pixels at or above 170.
    pub bright_fraction: f64,
    /// Share of pixels crushed to 0.
    #[serde(default)]
    pub clipped_shadows: f64,
    /// Share of pixels blown out to 255.
    #[serde(default)]
    pub clipped_highlights: f64,
    /// When the measured frame was taken.
    pub source_frame_timestamp: NaiveDateTime,
}

impl LightingSample {
    pub fn band(&self) -> BrightnessBand {
        BrightnessBand::classify(self.mean_brightness)
    }
}

/// Computes [`LightingSample`]s from frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightingAnalyzer;

impl LightingAnalyzer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Statistics over a raw 8-bit luminance buffer.
    pub fn analyze_luma(&self, pixels: &[u8], taken_at: NaiveDateTime) -> Result<LightingSample> {
        if pixels.is_empty() {
            return Err(CaptureError::AnalysisUnavailable(
                "preview frame has no pixels".to_string(),
            ));
        }

        let mut histogram = [0u64; 256];
        for &p in pixels {
            histogram[usize::from(p)] += 1;
        }

        let count = pixels.len() as f64;
        let sum: f64 = histogram
            .iter()
            .enumerate()
            .map(|(value, &n)| value as f64 * n as f64)
            .sum();
        let mean = sum / count;
        let variance: f64 = histogram
            .iter()
            .enumerate()
            .map(|(value, &n)| {
                let d = value as f64 - mean;
                d * d * n as f64
            })
            .sum::<f64>()
            / count;

        let dark: u64 = histogram[..usize::from(DARK_PIXEL_CUTOFF)].iter().sum();
        let bright: u64 = histogram[usize::from(BRIGHT_PIXEL_CUTOFF)..].iter().sum();

        let sample = LightingSample {
            mean_brightness: mean,
            brightness_spread: variance.sqrt(),
            dark_fraction: dark as f64 / count,
            bright_fraction: bright as f64 / count,
            clipped_shadows: histogram[0] as f64 / count,
            clipped_highlights: histogram[255] as f64 / count,
            source_frame_timestamp: taken_at,
        };
        trace!(
            mean = sample.mean_brightness,
            spread = sample.brightness_spread,
            band = %sample.band(),
            "Frame analysed"
        );
        Ok(sample)
    }

    /// Statistics over a decoded image (converted to luma).
    pub fn analyze_image(
        &self,
        image: &DynamicImage,
        taken_at: NaiveDateTime,
    ) -> Result<LightingSample> {
        let luma = image.to_luma8();
        self.analyze_luma(luma.as_raw(), taken_at)
    }

    /// Decode an image file and measure it.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn analyze_file(&self, path: &Path, taken_at: NaiveDateTime) -> Result<LightingSample> {
        let image = image::open(path).map_err(|e| {
            CaptureError::AnalysisUnavailable(format!("cannot decode {}: {e}", path.display()))
        })?;
        debug!(width = image.width(), height = image.height(), "Decoded frame");
        self.analyze_image(&image, taken_at)
    }
}
