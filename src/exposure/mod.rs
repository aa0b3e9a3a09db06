//! Exposure decision logic.
//!
//! - [`time_of_day`]: hour → lighting bucket → default recipe
//! - [`lighting`]: preview frame → brightness statistics and band
//! - [`planner`]: recipe + band (or manual override) → concrete settings

pub mod lighting;
pub mod planner;
pub mod settings;
pub mod time_of_day;

pub use lighting::{BandAdjustment, BrightnessBand, LightingAnalyzer, LightingSample};
pub use planner::{ExposurePlanner, ManualOverride, Plan, PlanSource};
pub use settings::{CaptureSettings, SensorLimits, WhiteBalance};
pub use time_of_day::{TimeBucket, classify};
