//! adaptcap library - adaptive still capture for fixed outdoor cameras.
//!
//! This library exposes the capture pipeline behind the `adaptcap` CLI for use
//! in tests and by other schedulers.
//!
//! # Modules
//!
//! - `exposure`: time-of-day buckets, lighting analysis and the exposure planner
//! - `backend`: capture tool abstraction, external tool backends and a mock
//! - `bracket`: multi-exposure capture with best-frame selection
//! - `metadata`: capture records embedded in the JPEG or written as sidecars
//! - `capture_log`: append-only per-capture log
//! - `pipeline`: one top-level capture, end to end
//! - `config`: configuration file handling
//! - `output`: output mode abstraction (robot/human)
#![forbid(unsafe_code)]

pub mod backend;
pub mod bracket;
pub mod capture_log;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod exposure;
pub mod logging;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod record;

pub use error::{CaptureError, Result};
