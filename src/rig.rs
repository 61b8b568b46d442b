//! The rig: jog controller, transport, camera and capture store together.
//!
//! Front ends drive the rig and show what it reports. Collaborator
//! failures come back as messages for the operator; none of them are
//! retried and none of them end the session.

use std::time::Duration;

use jiff::Timestamp;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::capture::{CaptureDevice, CaptureError, EncodeSettings};
use crate::config::CaptureConfig;
use crate::jog::JogController;
use crate::model::{CaptureRecord, Command, ImageFormat, JogIntent, PositionState, ProfileName};
use crate::storage::Storage;
use crate::transport::{Transport, axis_index};

/// What happened to one jog intent.
#[derive(Debug, PartialEq, Eq)]
pub enum JogOutcome {
    /// Jogging is disabled, or the axis could not move further.
    Ignored,
    /// Position updated and the command handed to the transport.
    Sent(Command),
    /// Position updated; the axis has no wire command, so nothing was sent.
    LocalOnly(Command),
    /// Position updated but the transport rejected the command.
    /// The estimate now leads the hardware.
    SendFailed { command: Command, error: String },
}

/// How captures are encoded and how long to wait for them.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub formats: Vec<ImageFormat>,
    pub timeout: Duration,
    pub encode: EncodeSettings,
}

impl From<&CaptureConfig> for CaptureSettings {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            formats: config.formats.clone(),
            timeout: config.timeout(),
            encode: EncodeSettings::from(config),
        }
    }
}

/// A saved capture, plus any formats that could not be produced.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub record: CaptureRecord,
    pub warnings: Vec<String>,
}

pub struct Rig {
    controller: JogController,
    profile: ProfileName,
    transport: Box<dyn Transport>,
    camera: Option<Box<dyn CaptureDevice>>,
    storage: Option<Storage>,
    capture: CaptureSettings,
}

impl Rig {
    pub fn new(
        controller: JogController,
        profile: ProfileName,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            controller,
            profile,
            transport,
            camera: None,
            storage: None,
            capture: CaptureSettings::from(&CaptureConfig::default()),
        }
    }

    #[must_use]
    pub fn with_camera(mut self, camera: Box<dyn CaptureDevice>) -> Self {
        self.camera = Some(camera);
        self
    }

    #[must_use]
    pub fn with_storage(mut self, storage: Storage, settings: CaptureSettings) -> Self {
        self.storage = Some(storage);
        self.capture = settings;
        self
    }

    pub fn controller(&self) -> &JogController {
        &self.controller
    }

    pub fn position(&self) -> PositionState {
        self.controller.position()
    }

    pub fn profile(&self) -> ProfileName {
        self.profile
    }

    pub fn is_enabled(&self) -> bool {
        self.controller.is_enabled()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        info!("jogging {}", if enabled { "enabled" } else { "disabled" });
        self.controller.set_enabled(enabled);
    }

    pub fn reset_position(&mut self) {
        info!("position reset from {}", self.controller.position());
        self.controller.reset();
    }

    pub fn transport_name(&self) -> String {
        self.transport.describe()
    }

    pub fn camera_name(&self) -> Option<String> {
        self.camera.as_ref().map(|c| c.describe())
    }

    /// Applies an intent and forwards the resulting command.
    pub fn jog(&mut self, intent: JogIntent) -> JogOutcome {
        let Some(command) = self.controller.handle_intent(intent) else {
            return JogOutcome::Ignored;
        };
        if axis_index(command.axis).is_none() {
            debug!("{command} is local-only, nothing sent");
            return JogOutcome::LocalOnly(command);
        }
        match self.transport.send(&command) {
            Ok(()) => JogOutcome::Sent(command),
            Err(e) => {
                warn!("failed to send {command}: {e}");
                JogOutcome::SendFailed {
                    command,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Sends a raw line to the motion controller. Position is untouched.
    pub fn send_line(&mut self, line: &str) -> Result<(), String> {
        self.transport.send_line(line).map_err(|e| {
            warn!("failed to send {line:?}: {e}");
            e.to_string()
        })
    }

    /// Triggers the camera and stores the result.
    ///
    /// The raw image is always kept. Encoded formats that fail are
    /// reported as warnings; the capture itself still succeeds.
    pub fn capture(&mut self) -> Result<CaptureOutcome, String> {
        let position = self.controller.position();
        let Some(camera) = self.camera.as_mut() else {
            return Err(CaptureError::NotConnected.to_string());
        };
        let Some(storage) = self.storage.as_ref() else {
            return Err("no capture directory configured".to_string());
        };

        let handle = camera.trigger_capture().map_err(|e| e.to_string())?;
        let raw = camera
            .wait_for_image(handle, self.capture.timeout)
            .map_err(|e| e.to_string())?;

        let mut images = vec![(ImageFormat::Iiq, raw.data.clone())];
        let mut warnings = Vec::new();
        for &format in &self.capture.formats {
            if format == ImageFormat::Iiq {
                continue;
            }
            match camera.encode(&raw, format, &self.capture.encode) {
                Ok(bytes) => images.push((format, bytes)),
                Err(e) => {
                    warn!("{format} encode failed: {e}");
                    warnings.push(format!("{format}: {e}"));
                }
            }
        }

        let record = CaptureRecord {
            id: Uuid::new_v4(),
            captured_at: Timestamp::now(),
            position,
            profile: self.profile,
            files: Vec::new(),
        };
        let record = storage
            .save_capture(record, &images)
            .map_err(|e| e.to_string())?;
        info!("captured {} at {}", record.id, record.position);
        Ok(CaptureOutcome { record, warnings })
    }

    pub fn capture_dir(&self, id: Uuid) -> Option<std::path::PathBuf> {
        self.storage.as_ref().map(|s| s.capture_dir(id))
    }
}
