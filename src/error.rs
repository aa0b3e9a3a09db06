//! Error types for capture pipeline operations.

use thiserror::Error;

/// Primary error type for capture operations.
#[derive(Error, Debug)]
pub enum CaptureError {
    // Backend errors
    #[error("No capture backend available (tried: {})", tried.join(", "))]
    NoBackendAvailable { tried: Vec<String> },

    #[error("Capture with {backend} timed out after {timeout_ms} ms")]
    CaptureTimeout { backend: String, timeout_ms: u64 },

    #[error("Capture incomplete at {path}: {reason}")]
    CaptureIncomplete { path: String, reason: String },

    #[error("Capture tool {backend} failed{}: {stderr}", code.map(|c| format!(" (exit {c})")).unwrap_or_default())]
    CaptureFailed {
        backend: String,
        code: Option<i32>,
        stderr: String,
    },

    // Analysis and bracketing
    #[error("Lighting analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    #[error("All {attempts} bracket exposures failed")]
    BracketExhausted { attempts: usize },

    // Filesystem
    #[error("Output directory {path} is not writable: {reason}")]
    DirectoryUnwritable { path: String, reason: String },

    // Planning and configuration errors
    #[error("Invalid hour {hour}: must be 0-23")]
    InvalidHour { hour: u32 },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // Records and images
    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl CaptureError {
    /// Returns true for failures scoped to a single capture attempt.
    ///
    /// Inside a bracket these move the controller on to the next offset;
    /// for a single capture they end the invocation.
    pub const fn is_attempt_local(&self) -> bool {
        matches!(
            self,
            Self::CaptureTimeout { .. } | Self::CaptureIncomplete { .. } | Self::CaptureFailed { .. }
        )
    }

    /// Returns true if the error is recoverable by the operator.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoBackendAvailable { .. }
                | Self::DirectoryUnwritable { .. }
                | Self::InvalidHour { .. }
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
                | Self::ConfigInvalid(_)
        )
    }

    /// Process exit status for this error.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::CaptureTimeout { .. }
            | Self::CaptureIncomplete { .. }
            | Self::CaptureFailed { .. }
            | Self::BracketExhausted { .. } => 2,
            Self::NoBackendAvailable { .. } => 3,
            Self::DirectoryUnwritable { .. } => 4,
            Self::InvalidHour { .. }
            | Self::ConfigNotFound { .. }
            | Self::ConfigParse(_)
            | Self::ConfigInvalid(_) => 78,
            _ => 1,
        }
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NoBackendAvailable { .. } => {
                Some("Install rpicam-apps (rpicam-still) or enable the legacy camera stack")
            }
            Self::CaptureTimeout { .. } => Some("Raise --timeout-ms or check the camera cable"),
            Self::DirectoryUnwritable { .. } => {
                Some("Check permissions or pass a different --output-dir")
            }
            Self::BracketExhausted { .. } => Some("Retry without --bracket to see the tool's error"),
            Self::ConfigNotFound { .. } => Some("Check --config or ADAPTCAP_CONFIG"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using CaptureError.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CaptureError::Other(format!("{}: {e}", f().into())))
    }
}
