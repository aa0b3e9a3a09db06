//! Loading and saving [`CaptureConfig`] files in YAML or TOML.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, trace};

use super::schema::CaptureConfig;
use crate::error::{CaptureError, Result};

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml).
    Yaml,
    /// TOML format (.toml).
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        trace!(extension = %ext, "Detecting config format from extension");
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    fn detect(path: &Path) -> Result<Self> {
        Self::from_extension(path).ok_or_else(|| {
            CaptureError::ConfigParse(format!(
                "Unknown config format for '{}': expected .yaml, .yml, or .toml",
                path.display()
            ))
        })
    }
}

/// Default config location: `<config_dir>/adaptcap/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("adaptcap").join("config.toml"))
}

/// Pick the config file to load.
///
/// An explicit path (from `--config` or `ADAPTCAP_CONFIG`) is always used,
/// even if missing, so a typo surfaces as an error. Otherwise the default
/// location is used only if it exists.
pub fn locate_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    default_config_path().filter(|p| p.is_file())
}

/// Load the located config, or defaults if there is none.
pub fn load_or_default(explicit: Option<&Path>) -> Result<(CaptureConfig, Option<PathBuf>)> {
    match locate_config(explicit) {
        Some(path) => Ok((load_config(&path)?, Some(path))),
        None => {
            debug!("No config file, using defaults");
            Ok((CaptureConfig::default(), None))
        }
    }
}

/// Load a configuration file, resolving relative paths against its directory.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The format cannot be detected from the extension
/// - The file content cannot be parsed
/// - Validation fails
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CaptureConfig> {
    let path = path.as_ref();
    info!("Loading configuration file");

    let format = ConfigFormat::detect(path)?;
    debug!(format = ?format, "Detected config format");

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CaptureError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            CaptureError::Io(e)
        }
    })?;
    debug!(bytes = content.len(), "Read config file");

    let mut config = load_config_from_str(&content, format)?;
    config.resolve_paths(path)?;
    Ok(config)
}

/// Parse and validate a configuration string.
///
/// Paths are left as written.
#[instrument(skip(content), fields(format = ?format, content_len = content.len()))]
pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<CaptureConfig> {
    let config: CaptureConfig = match format {
        ConfigFormat::Yaml => {
            // An empty YAML document is `null`, not an empty mapping.
            if content.trim().is_empty() {
                CaptureConfig::default()
            } else {
                serde_yaml::from_str(content)
                    .map_err(|e| CaptureError::ConfigParse(format!("YAML: {e}")))?
            }
        }
        ConfigFormat::Toml => toml::from_str(content)
            .map_err(|e| CaptureError::ConfigParse(format!("TOML: {e}")))?,
    };

    config.validate()?;

    info!(
        output_dir = %config.output_dir.display(),
        adaptive = config.adaptive,
        bracket = config.bracket,
        manual = config.manual.is_some(),
        "Configuration loaded and validated"
    );
    Ok(config)
}

/// Save a configuration to a file, format chosen by extension.
#[instrument(skip(config), fields(path = %path.as_ref().display()))]
pub fn save_config<P: AsRef<Path>>(config: &CaptureConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = ConfigFormat::detect(path)?;

    let content = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config)
            .map_err(|e| CaptureError::ConfigParse(format!("YAML: {e}")))?,
        ConfigFormat::Toml => toml::to_string_pretty(config)
            .map_err(|e| CaptureError::ConfigParse(format!("TOML: {e}")))?,
    };

    std::fs::write(path, content)?;
    info!(
        bytes = path.metadata().map(|m| m.len()).unwrap_or(0),
        "Configuration saved"
    );
    Ok(())
}
