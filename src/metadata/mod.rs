//! Persisting and reading back [`CaptureRecord`]s.
//!
//! Two storage modes carry the same JSON document:
//!
//! - **embedded**: a JPEG comment segment tagged [`RECORD_TAG`] inside the
//!   image itself
//! - **sidecar**: `<stem>_metadata.json` next to the image

pub mod jpeg;

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{CaptureError, Result};
use crate::record::CaptureRecord;

/// Tag identifying our comment segment.
pub const RECORD_TAG: &str = "adaptcap-record";

/// Where a record is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MetadataMode {
    /// Inside the JPEG.
    #[default]
    Embedded,
    /// In a JSON file beside the JPEG.
    Sidecar,
}

/// Where a record is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MetadataSource {
    /// Embedded first, then the sidecar.
    #[default]
    Auto,
    Embedded,
    Sidecar,
}

/// Sidecar path for an image: `dir/captured_X.jpg` → `dir/captured_X_metadata.json`.
pub fn sidecar_path(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    image.with_file_name(format!("{stem}_metadata.json"))
}

/// Writes and reads capture records.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataRecorder;

impl MetadataRecorder {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Persist `record` for its kept image. Returns where it was stored.
    ///
    /// # Errors
    ///
    /// Fails with [`CaptureError::Metadata`] if the record has no image, the
    /// image is not a JPEG, or the serialized record does not fit.
    #[instrument(skip(self, record), fields(image = ?record.image_path()))]
    pub fn record(&self, record: &CaptureRecord, mode: MetadataMode) -> Result<PathBuf> {
        let image = record.image_path().ok_or_else(|| {
            CaptureError::Metadata("record has no image file to describe".to_string())
        })?;

        let stored = match mode {
            MetadataMode::Embedded => {
                let json = serde_json::to_vec(record)
                    .map_err(|e| CaptureError::Metadata(format!("serializing record: {e}")))?;
                embed(image, &json)?;
                image.to_path_buf()
            }
            MetadataMode::Sidecar => {
                let json = serde_json::to_string_pretty(record)
                    .map_err(|e| CaptureError::Metadata(format!("serializing record: {e}")))?;
                let path = sidecar_path(image);
                std::fs::write(&path, json)?;
                path
            }
        };
        info!(?mode, stored = %stored.display(), "Capture record written");
        Ok(stored)
    }

    /// Read the record describing `image`.
    ///
    /// # Errors
    ///
    /// Fails with [`CaptureError::Metadata`] if no record is found in the
    /// requested place or it cannot be parsed.
    #[instrument(skip(self), fields(image = %image.display()))]
    pub fn read(&self, image: &Path, source: MetadataSource) -> Result<CaptureRecord> {
        match source {
            MetadataSource::Embedded => read_embedded(image)?.ok_or_else(|| {
                CaptureError::Metadata(format!("{} has no embedded record", image.display()))
            }),
            MetadataSource::Sidecar => read_sidecar(image),
            MetadataSource::Auto => match read_embedded(image) {
                Ok(Some(record)) => Ok(record),
                Ok(None) => {
                    debug!("No embedded record, trying sidecar");
                    read_sidecar(image)
                }
                Err(e) => {
                    debug!(error = %e, "Embedded read failed, trying sidecar");
                    read_sidecar(image)
                }
            },
        }
    }
}

/// Rewrite `image` with the record segment, atomically.
fn embed(image: &Path, json: &[u8]) -> Result<()> {
    let original = std::fs::read(image)?;
    let permissions = std::fs::metadata(image)?.permissions();
    let tagged = jpeg::insert_comment(&original, RECORD_TAG, json)?;

    let dir = image.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&tagged)?;
    // The replacement keeps the mode the capture tool gave the image.
    tmp.as_file().set_permissions(permissions)?;
    tmp.as_file().sync_all()?;
    tmp.persist(image).map_err(|e| CaptureError::Io(e.error))?;
    debug!(bytes = tagged.len(), "Embedded record");
    Ok(())
}

fn read_embedded(image: &Path) -> Result<Option<CaptureRecord>> {
    let bytes = std::fs::read(image)?;
    jpeg::find_comment(&bytes, RECORD_TAG)?
        .map(|body| {
            serde_json::from_slice(&body)
                .map_err(|e| CaptureError::Metadata(format!("embedded record is corrupt: {e}")))
        })
        .transpose()
}

fn read_sidecar(image: &Path) -> Result<CaptureRecord> {
    let path = sidecar_path(image);
    let content = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CaptureError::Metadata(format!("no record found for {}", image.display()))
        } else {
            CaptureError::Io(e)
        }
    })?;
    serde_json::from_str(&content)
        .map_err(|e| CaptureError::Metadata(format!("{} is corrupt: {e}", path.display())))
}
