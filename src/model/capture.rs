//! Capture records: what was written to disk for one exposure.

use std::fmt;

use clap::ValueEnum;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PositionState, ProfileName};

/// An image format the capture pipeline can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ImageFormat {
    /// The camera's raw file, written through unchanged.
    Iiq,
    Tiff,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Iiq => "iiq",
            Self::Tiff => "tiff",
            Self::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Iiq => "iiq",
            Self::Tiff => "tiff",
            Self::Jpeg => "jpeg",
        })
    }
}

/// One file written for a capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFile {
    pub format: ImageFormat,
    pub file_name: String,
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the file contents.
    pub sha256: String,
}

/// Sidecar metadata for a capture, stored as `capture.json`.
///
/// The position is a snapshot of the local estimate at trigger time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRecord {
    pub id: Uuid,
    pub captured_at: Timestamp,
    pub position: PositionState,
    pub profile: ProfileName,
    pub files: Vec<ImageFile>,
}
