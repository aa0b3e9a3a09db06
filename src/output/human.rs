//! Human-friendly terminal output using `console` styling.

use std::fmt::Display;

use console::{StyledObject, style};
use tracing::{debug, instrument};

use crate::error::CaptureError;
use crate::pipeline::{CaptureOutcome, MetadataStatus};
use crate::record::{CaptureAttempt, CaptureRecord};

use super::{BackendStatus, Output, PlanReport, VersionInfo};

/// Styled terminal output implementation for human users.
#[derive(Debug, Clone, Copy)]
pub struct HumanOutput {
    color: bool,
}

impl HumanOutput {
    #[instrument]
    pub fn new(color: bool) -> Self {
        debug!("Creating HumanOutput");
        Self { color }
    }

    fn paint<D: Display>(&self, value: D) -> StyledObject<D> {
        style(value).force_styling(self.color)
    }

    fn field(&self, label: &str, value: impl Display) {
        println!("  {:<12} {value}", self.paint(label).dim());
    }

    fn attempt_line(&self, attempt: &CaptureAttempt) -> String {
        let ev = attempt
            .ev_offset
            .map(|ev| format!("EV {ev:+.1} "))
            .unwrap_or_default();
        match &attempt.failure {
            Some(failure) => format!("{ev}{} {}", attempt.settings, self.paint(failure).red()),
            None => format!("{ev}{}", attempt.settings),
        }
    }
}

impl Output for HumanOutput {
    #[instrument(skip(self))]
    fn success(&self, message: &str) {
        println!("{}{message}", self.paint("[OK] ").green().bold());
    }

    #[instrument(skip(self))]
    fn error(&self, error: &CaptureError) {
        eprintln!("{}{error}", self.paint("[ERR] ").red().bold());
        if let Some(suggestion) = error.suggestion() {
            eprintln!("      {}", self.paint(suggestion).yellow());
        }
    }

    #[instrument(skip(self))]
    fn warning(&self, message: &str) {
        eprintln!("{}{message}", self.paint("[WARN] ").yellow().bold());
    }

    #[instrument(skip(self))]
    fn info(&self, message: &str) {
        println!("{}{message}", self.paint("[INFO] ").cyan());
    }

    #[instrument(skip_all, fields(path = %outcome.image_path.display()))]
    fn capture_outcome(&self, outcome: &CaptureOutcome) {
        self.success(&format!(
            "Captured {} ({:.1} KB)",
            outcome.image_path.display(),
            outcome.size_bytes as f64 / 1024.0
        ));
        let record = &outcome.record;
        self.field("plan", record.plan);
        self.field("settings", record.attempt.settings);
        self.field("backend", &record.attempt.backend);
        self.field("lighting", &outcome.analysis);
        if !record.discarded.is_empty() {
            self.field(
                "bracket",
                format!("kept 1 of {}", record.discarded.len() + 1),
            );
        }
        match &outcome.metadata {
            MetadataStatus::Stored { path } => self.field("metadata", path.display()),
            MetadataStatus::Failed { reason } => {
                self.warning(&format!("Metadata not stored: {reason}"));
            }
        }
    }

    #[instrument(skip_all, fields(hour = report.hour))]
    fn plan(&self, report: &PlanReport) {
        println!(
            "{} {:02}:00",
            self.paint("Plan for").bold(),
            report.hour
        );
        self.field("bucket", report.bucket);
        if let Some(brightness) = report.brightness {
            self.field("brightness", brightness);
        }
        if let Some(band) = report.band {
            self.field("band", band);
        }
        self.field("source", report.plan);
        self.field("settings", self.paint(report.settings).cyan());
    }

    #[instrument(skip_all)]
    fn record(&self, record: &CaptureRecord) {
        let image = record
            .image_path()
            .map_or_else(|| "-".to_string(), |p| p.display().to_string());
        println!("{} {image}", self.paint("Capture record for").bold());
        self.field("taken", record.timestamp);
        self.field("plan", record.plan);
        self.field("backend", &record.attempt.backend);
        self.field("settings", self.attempt_line(&record.attempt));
        self.field(
            "output",
            format!(
                "{}x{} q{}{}{}",
                record.output.width,
                record.output.height,
                record.output.quality,
                if record.output.hflip { " hflip" } else { "" },
                if record.output.vflip { " vflip" } else { "" },
            ),
        );
        if let Some(sample) = &record.attempt.lighting {
            self.field(
                "preview",
                format!("mean {:.1} ({})", sample.mean_brightness, sample.band()),
            );
        }
        if let Some(sample) = &record.attempt.result_analysis {
            self.field(
                "result",
                format!("mean {:.1} ({})", sample.mean_brightness, sample.band()),
            );
        }
        for attempt in &record.discarded {
            self.field("discarded", self.attempt_line(attempt));
        }
    }

    #[instrument(skip_all, fields(count = backends.len()))]
    fn backends(&self, backends: &[BackendStatus]) {
        for (rank, status) in backends.iter().enumerate() {
            let mark = if status.available {
                self.paint("found").green()
            } else {
                self.paint("missing").red()
            };
            let location = status
                .program
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            println!("{}. {:<16} {mark} {location}", rank + 1, status.tool.to_string());
        }
    }

    fn version_info(&self, info: &VersionInfo) {
        println!("{} {}", self.paint("adaptcap").bold().cyan(), info.version);
        self.field("git", info.git_sha);
        self.field("built", info.build_timestamp);
        self.field("rustc", info.rustc);
        self.field("target", info.target);
    }
}
