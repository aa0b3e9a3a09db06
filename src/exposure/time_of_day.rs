//! Time-of-day lighting buckets and their default exposure recipes.

use serde::{Deserialize, Serialize};

use super::settings::{CaptureSettings, WhiteBalance};
use crate::error::{CaptureError, Result};

/// Coarse lighting bucket derived from the wall-clock hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Dawn,
    Day,
    Dusk,
    Night,
}

/// Start hour of each bucket, ascending. A bucket runs until the next entry
/// starts; the last entry wraps past midnight via the first.
const BUCKET_STARTS: [(u32, TimeBucket); 5] = [
    (0, TimeBucket::Night),
    (6, TimeBucket::Dawn),
    (9, TimeBucket::Day),
    (17, TimeBucket::Dusk),
    (20, TimeBucket::Night),
];

const DAWN_RECIPE: CaptureSettings = CaptureSettings::recipe(8_000, 400, WhiteBalance::Auto, 0.3);
const DAY_RECIPE: CaptureSettings = CaptureSettings::recipe(2_000, 100, WhiteBalance::Daylight, 0.0);
const DUSK_RECIPE: CaptureSettings = CaptureSettings::recipe(8_000, 400, WhiteBalance::Auto, 0.3);
const NIGHT_RECIPE: CaptureSettings =
    CaptureSettings::recipe(30_000, 800, WhiteBalance::Auto, 0.5);

impl TimeBucket {
    /// All buckets in day order.
    pub const ALL: [Self; 4] = [Self::Dawn, Self::Day, Self::Dusk, Self::Night];

    /// Classify an hour (0-23).
    pub fn from_hour(hour: u32) -> Result<Self> {
        if hour > 23 {
            return Err(CaptureError::InvalidHour { hour });
        }
        let bucket = BUCKET_STARTS
            .iter()
            .rev()
            .find(|(start, _)| *start <= hour)
            .map_or(TimeBucket::Night, |(_, bucket)| *bucket);
        Ok(bucket)
    }

    /// Default exposure recipe for this bucket.
    pub const fn recipe(self) -> CaptureSettings {
        match self {
            Self::Dawn => DAWN_RECIPE,
            Self::Day => DAY_RECIPE,
            Self::Dusk => DUSK_RECIPE,
            Self::Night => NIGHT_RECIPE,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dawn => "dawn",
            Self::Day => "day",
            Self::Dusk => "dusk",
            Self::Night => "night",
        }
    }
}

impl std::fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an hour and return its bucket with the default recipe.
pub fn classify(hour: u32) -> Result<(TimeBucket, CaptureSettings)> {
    let bucket = TimeBucket::from_hour(hour)?;
    Ok((bucket, bucket.recipe()))
}
