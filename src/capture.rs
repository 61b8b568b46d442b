//! Capture devices: trigger an exposure, collect the raw image, encode it.
//!
//! The camera itself is a closed collaborator. This module only defines
//! the seam ([`CaptureDevice`]) and one backend that reaches the vendor
//! tooling through external programs.

mod command;

pub use command::CommandCamera;

use std::io;
use std::time::Duration;

use crate::config::CaptureConfig;
use crate::model::ImageFormat;

/// Errors that can occur while capturing or encoding.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("No camera connected")]
    NotConnected,

    #[error("failed to run {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("no image within {0:?}")]
    Timeout(Duration),

    #[error("capture produced an empty image")]
    EmptyImage,

    #[error("no capture pending for handle {0}")]
    UnknownHandle(u64),

    #[error("{0} output is not supported by this camera")]
    UnsupportedFormat(ImageFormat),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, CaptureError>;

/// Identifies a triggered exposure until its image is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHandle(pub u64);

/// The camera's raw file, exactly as delivered.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub data: Vec<u8>,
}

/// Settings handed to the encoder.
#[derive(Debug, Clone, Copy)]
pub struct EncodeSettings {
    pub output_width: u32,
    pub tiff_tile_size: u32,
    /// 1 to 100.
    pub jpeg_quality: u8,
    /// How long one conversion may run.
    pub timeout: Duration,
}

impl From<&CaptureConfig> for EncodeSettings {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            output_width: config.output_width,
            tiff_tile_size: config.tiff_tile_size,
            jpeg_quality: config.jpeg_quality,
            timeout: config.timeout(),
        }
    }
}

/// A camera that can be triggered and read back.
pub trait CaptureDevice {
    fn trigger_capture(&mut self) -> Result<ImageHandle>;

    /// Blocks until the triggered image arrives or `timeout` passes.
    fn wait_for_image(&mut self, handle: ImageHandle, timeout: Duration) -> Result<RawImage>;

    /// Encodes a raw image. [`ImageFormat::Iiq`] is a passthrough.
    fn encode(
        &mut self,
        raw: &RawImage,
        format: ImageFormat,
        settings: &EncodeSettings,
    ) -> Result<Vec<u8>>;

    /// A short description for status displays.
    fn describe(&self) -> String;
}

/// Opens the configured camera.
///
/// An unconfigured camera is [`CaptureError::NotConnected`]; callers
/// report it and carry on without one.
pub fn open_camera(config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>> {
    if config.command.is_empty() {
        return Err(CaptureError::NotConnected);
    }
    Ok(Box::new(CommandCamera::new(
        config.command.clone(),
        config.convert_command.clone(),
    )))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_camera_is_not_connected() {
        let err = open_camera(&CaptureConfig::default()).err().unwrap();
        assert!(matches!(err, CaptureError::NotConnected));
        assert_eq!(err.to_string(), "No camera connected");
    }

    #[test]
    fn encode_settings_follow_config() {
        let config = CaptureConfig {
            jpeg_quality: 80,
            timeout_secs: 5,
            ..CaptureConfig::default()
        };
        let settings = EncodeSettings::from(&config);
        assert_eq!(settings.jpeg_quality, 80);
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(EncodeSettings::from(&CaptureConfig::default()).jpeg_quality, 90);
    }

    #[test]
    fn configured_camera_opens() {
        let config = CaptureConfig {
            command: vec!["capture-one".into(), "--stdout".into()],
            ..CaptureConfig::default()
        };
        let camera = open_camera(&config).unwrap();
        assert_eq!(camera.describe(), "capture-one --stdout");
    }
}
