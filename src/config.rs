//! rigjog configuration.
//!
//! Located through a resolution chain:
//!
//! 1. `--config <path>`: explicit per-invocation file, must exist
//! 2. `RIGJOG_CONFIG` env var: same, set once per session
//! 3. `~/.rigjog/config.toml`: optional; built-in defaults when missing
//!
//! Every table and key is optional. Unknown keys are rejected.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use serde::{Deserialize, Serialize};

use crate::keymap::{KeyAction, Keymap};
use crate::model::{Axis, ImageFormat, ProfileName, StepProfile};

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("profile `{profile}` has a non-positive step for {axis}")]
    InvalidStep { profile: ProfileName, axis: Axis },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("capture.jpeg-quality must be between 1 and 100, got {0}")]
    JpegQuality(u8),

    #[error("console keymap `{0}` has no key to enable jogging")]
    ConsoleCannotEnable(Keymap),
}

pub type Result<T> = core::result::Result<T, ConfigError>;

/// rigjog configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Config {
    pub serial: SerialConfig,
    pub profiles: Profiles,
    pub console: ConsoleConfig,
    pub jog_mode: JogModeConfig,
    pub capture: CaptureConfig,
}

/// The motion controller link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct SerialConfig {
    /// Port path, e.g. `/dev/ttyACM0` or `COM3`.
    /// Without one, commands go to a dry-run transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    pub baud: u32,
    /// How long the firmware needs after the port opens.
    pub wake_up_ms: u64,
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: 115_200,
            wake_up_ms: 2000,
            timeout_ms: 1000,
        }
    }
}

impl SerialConfig {
    pub fn wake_up(&self) -> Duration {
        Duration::from_millis(self.wake_up_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Step tables for the named profiles. Overriding one replaces all four steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Profiles {
    pub console: StepProfile,
    pub serial: StepProfile,
}

impl Default for Profiles {
    fn default() -> Self {
        Self {
            console: ProfileName::Console.builtin(),
            serial: ProfileName::Serial.builtin(),
        }
    }
}

impl Profiles {
    pub fn get(&self, name: ProfileName) -> StepProfile {
        match name {
            ProfileName::Console => self.console,
            ProfileName::Serial => self.serial,
        }
    }
}

/// The keyboard console: one jog per keypress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct ConsoleConfig {
    pub profile: ProfileName,
    pub keymap: Keymap,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            profile: ProfileName::Console,
            keymap: Keymap::Console,
        }
    }
}

/// The serial prompt's jog mode: continuous jogging while keys are held.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct JogModeConfig {
    pub profile: ProfileName,
    pub keymap: Keymap,
    /// One jog per held axis per tick.
    pub tick_ms: u64,
    /// A key counts as held this long after its last press or repeat.
    pub hold_ms: u64,
}

impl Default for JogModeConfig {
    fn default() -> Self {
        Self {
            profile: ProfileName::Serial,
            keymap: Keymap::Serial,
            tick_ms: 200,
            hold_ms: 600,
        }
    }
}

impl JogModeConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }
}

/// The camera and where its images go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct CaptureConfig {
    /// Defaults to `~/.rigjog/captures`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    pub formats: Vec<ImageFormat>,
    pub timeout_secs: u64,
    pub output_width: u32,
    pub tiff_tile_size: u32,
    /// JPEG quality, 1 to 100.
    pub jpeg_quality: u8,
    /// Program and arguments that capture one image and write it to stdout.
    /// Empty means no camera is connected.
    pub command: Vec<String>,
    /// Program and arguments that read a raw image on stdin and write the
    /// converted image to stdout. `{format}`, `{width}`, `{tile}` and
    /// `{quality}` are substituted. Empty means only raw passthrough is
    /// available.
    pub convert_command: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            formats: vec![ImageFormat::Iiq],
            timeout_secs: 30,
            output_width: 14_204,
            tiff_tile_size: 512,
            jpeg_quality: 90,
            command: Vec::new(),
            convert_command: Vec::new(),
        }
    }
}

impl CaptureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The capture root: configured, or `~/.rigjog/captures`.
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir
            .clone()
            .or_else(|| home_dir().map(|h| h.join("captures")))
    }
}

/// rigjog's home directory: `~/.rigjog`.
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".rigjog"))
}

impl Config {
    /// Load config through the resolution chain.
    ///
    /// Returns the config and the file it came from, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        // 1. Explicit --config flag.
        if let Some(path) = explicit {
            return Self::load_required(path).map(|c| (c, Some(path.to_path_buf())));
        }

        // 2. RIGJOG_CONFIG environment variable.
        if let Ok(path) = env::var("RIGJOG_CONFIG")
            && !path.is_empty()
        {
            let path = PathBuf::from(path);
            return Self::load_required(&path).map(|c| (c, Some(path)));
        }

        // 3. ~/.rigjog/config.toml.
        let Some(path) = Self::default_path() else {
            return Ok((Self::default(), None));
        };
        match fs::read_to_string(&path) {
            Ok(contents) => Ok((Self::parse(&path, &contents)?, Some(path))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok((Self::default(), None)),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// The default config file path: `~/.rigjog/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        home_dir().map(|h| h.join("config.toml"))
    }

    fn load_required(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::parse(path, &contents)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks what serde cannot: positive steps, non-zero timings, value
    /// ranges, and a console keymap that can enable jogging.
    pub fn validate(&self) -> Result<()> {
        for profile in [ProfileName::Console, ProfileName::Serial] {
            if let Some(axis) = self.profiles.get(profile).invalid_axis() {
                return Err(ConfigError::InvalidStep { profile, axis });
            }
        }
        if self.serial.baud == 0 {
            return Err(ConfigError::Zero("serial.baud"));
        }
        if self.jog_mode.tick_ms == 0 {
            return Err(ConfigError::Zero("jog-mode.tick-ms"));
        }
        if self.capture.timeout_secs == 0 {
            return Err(ConfigError::Zero("capture.timeout-secs"));
        }
        if self.capture.output_width == 0 {
            return Err(ConfigError::Zero("capture.output-width"));
        }
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(ConfigError::JpegQuality(self.capture.jpeg_quality));
        }
        if !self.console.keymap.binds(KeyAction::ToggleJog) {
            return Err(ConfigError::ConsoleCannotEnable(self.console.keymap));
        }
        Ok(())
    }

    /// The config rendered back as TOML.
    pub fn to_toml(&self) -> core::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn parse(s: &str) -> Result<Config> {
        Config::parse(Path::new("test.toml"), s)
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.profiles.get(ProfileName::Serial), StepProfile::SERIAL);
        assert_eq!(config.console.keymap, Keymap::Console);
        assert_eq!(config.jog_mode.keymap, Keymap::Serial);
        assert_eq!(config.capture.formats, [ImageFormat::Iiq]);
        assert!(config.capture.command.is_empty());
    }

    #[test]
    fn partial_file_merges_with_defaults() {
        let config = parse(
            r#"
            [serial]
            port = "COM3"

            [jog-mode]
            tick-ms = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("COM3"));
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.jog_mode.tick_ms, 50);
        assert_eq!(config.jog_mode.hold_ms, 600);
    }

    #[test]
    fn profile_override() {
        let config = parse(
            r#"
            [profiles.console]
            theta = 5
            phi = 5
            h = 2
            focus = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.profiles.console.theta, 5);
        assert_eq!(config.profiles.serial, StepProfile::SERIAL);
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = parse(
            r#"
            [profiles.serial]
            theta = 100
            phi = 0
            h = 100
            focus = 1
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidStep {
                profile: ProfileName::Serial,
                axis: Axis::Phi
            }
        ));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = parse("[serial]\nbaudrate = 9600\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_tick_is_rejected() {
        let err = parse("[jog-mode]\ntick-ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Zero("jog-mode.tick-ms")));
    }

    #[test]
    fn jpeg_quality_out_of_range_is_rejected() {
        assert_eq!(parse("").unwrap().capture.jpeg_quality, 90);
        assert_eq!(
            parse("[capture]\njpeg-quality = 100\n").unwrap().capture.jpeg_quality,
            100
        );
        let err = parse("[capture]\njpeg-quality = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::JpegQuality(0)));
        let err = parse("[capture]\njpeg-quality = 101\n").unwrap_err();
        assert!(matches!(err, ConfigError::JpegQuality(101)));
    }

    #[test]
    fn console_keymap_must_be_able_to_enable_jogging() {
        let err = parse("[console]\nkeymap = \"serial\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ConsoleCannotEnable(Keymap::Serial)));
        // Jog mode enables itself, so the serial table is fine there.
        assert!(parse("[jog-mode]\nkeymap = \"serial\"\n").is_ok());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rig.toml");
        fs::write(&path, "[console]\nprofile = \"serial\"\n").unwrap();

        let (config, source) = Config::load(Some(&path)).unwrap();

        assert_eq!(config.console.profile, ProfileName::Serial);
        assert_eq!(source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn renders_back_to_toml() {
        let rendered = Config::default().to_toml().unwrap();
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(reparsed.serial.wake_up_ms, 2000);
        assert_eq!(reparsed.profiles.serial, StepProfile::SERIAL);
    }
}
