//! CLI interface for rigjog.
//!
//! Two interactive front ends and a handful of one-shot commands:
//!
//! - `rigjog console`: keyboard console, one jog per keypress.
//! - `rigjog repl`: serial prompt; `j` enters continuous jog mode.
//! - `rigjog jog|send|capture|sequence`: non-interactive, for scripts.
//! - `rigjog captures [ID]|config`: inspect stored captures and settings.

mod format;

use std::path::PathBuf;
use std::thread;

use clap::{Parser, Subcommand};
use log::info;
use uuid::Uuid;

use crate::capture::open_camera;
use crate::config::Config;
use crate::jog::JogController;
use crate::model::{Axis, Direction, ImageFormat, JogIntent, ProfileName};
use crate::rig::{CaptureSettings, JogOutcome, Rig};
use crate::sequence::{self, Sequence};
use crate::storage::Storage;
use crate::transport::{DryRunTransport, SerialTransport, Transport};
use crate::{repl, tui};

use format::{format_capture_detail, format_capture_row, format_sequence_report};

/// rigjog: jog a camera rig and capture images.
#[derive(Debug, Parser)]
#[command(name = "rigjog", version, after_long_help = KEYS_HELP)]
pub struct Cli {
    /// Config file (default: `$RIGJOG_CONFIG` or `~/.rigjog/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Step profile, overriding the front end's configured one.
    #[arg(long, global = true, value_enum)]
    profile: Option<ProfileName>,

    /// Serial port, overriding `serial.port`.
    #[arg(long, global = true)]
    port: Option<String>,

    /// Log commands instead of opening the serial port.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

const KEYS_HELP: &str = r"Console keys (profile `console`):
  A/D  θ -/+      W/S  φ +/-      Q/E  h +/-      +/-  focus
  space  toggle jogging (off at start)      C  capture      0  zero      esc  quit

Jog mode keys (`repl`, then `j`; profile `serial`):
  A/D  θ +/-      W/S  φ +/-      E/Q  h +/-      C  capture      esc  leave";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Keyboard console with position and status panels.
    Console,

    /// Serial prompt. `j` enters continuous jog mode; `help` lists commands.
    Repl,

    /// Jog one axis and exit. Prints each line sent.
    Jog {
        #[arg(value_enum)]
        axis: Axis,

        #[arg(value_enum)]
        direction: Direction,

        /// How many steps.
        #[arg(long, default_value_t = 1)]
        count: u32,
    },

    /// Send a raw line to the motion controller.
    Send {
        /// The command, e.g. `J0+100`. A newline is appended.
        line: String,
    },

    /// Take one picture into the capture directory.
    Capture {
        /// Formats to write, overriding `capture.formats`. Raw is always kept.
        #[arg(long, value_enum)]
        format: Vec<ImageFormat>,
    },

    /// List stored captures, oldest first, or show one in detail.
    Captures { id: Option<Uuid> },

    /// Run a capture sequence file.
    Sequence { file: PathBuf },

    /// Print the resolved configuration.
    Config,
}

impl Command {
    /// Interactive commands own the terminal; their logs go to a file.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Console | Self::Repl)
    }
}

/// A connected rig plus anything the operator should be told about it.
struct Connected {
    rig: Rig,
    notices: Vec<String>,
}

impl Cli {
    pub fn run(self) -> Result<(), String> {
        let (config, source) =
            Config::load(self.config.as_deref()).map_err(|e| e.to_string())?;
        match &source {
            Some(path) => info!("config loaded from {}", path.display()),
            None => info!("no config file, using defaults"),
        }

        match &self.command {
            Command::Console => {
                let mut connected = self.connect(&config, config.console.profile)?;
                tui::run(&mut connected.rig, config.console.keymap, &connected.notices)
                    .map_err(|e| format!("console failed: {e}"))
            }
            Command::Repl => {
                let mut connected = self.connect(&config, config.jog_mode.profile)?;
                repl::run(&mut connected.rig, &config.jog_mode, &connected.notices)
                    .map_err(|e| format!("prompt failed: {e}"))
            }
            Command::Jog {
                axis,
                direction,
                count,
            } => self.jog(&config, JogIntent::new(*axis, *direction), *count),
            Command::Send { line } => {
                let mut connected = self.connect(&config, ProfileName::Serial)?;
                print_notices(&connected.notices);
                connected.rig.send_line(line)
            }
            Command::Capture { format } => self.capture(config, format),
            Command::Captures { id } => show_captures(&config, *id),
            Command::Sequence { file } => {
                let sequence = Sequence::load(file)?;
                let mut connected = self.connect(&config, config.jog_mode.profile)?;
                print_notices(&connected.notices);
                let report = sequence::run(&mut connected.rig, &sequence, thread::sleep);
                println!("{}", format_sequence_report(&report));
                println!("{}", connected.rig.position());
                match report.aborted {
                    Some(reason) => Err(reason),
                    None => Ok(()),
                }
            }
            Command::Config => {
                match &source {
                    Some(path) => println!("# {}", path.display()),
                    None => println!("# built-in defaults"),
                }
                let rendered = config.to_toml().map_err(|e| e.to_string())?;
                print!("{rendered}");
                Ok(())
            }
        }
    }

    fn jog(&self, config: &Config, intent: JogIntent, count: u32) -> Result<(), String> {
        let mut connected = self.connect(config, config.jog_mode.profile)?;
        print_notices(&connected.notices);
        let rig = &mut connected.rig;
        rig.set_enabled(true);
        for _ in 0..count {
            match rig.jog(intent) {
                JogOutcome::Sent(command) => println!("{command}"),
                JogOutcome::LocalOnly(command) => println!("{command} (local)"),
                JogOutcome::Ignored => {}
                JogOutcome::SendFailed { command, error } => {
                    return Err(format!("send {command} failed: {error}"));
                }
            }
        }
        println!("{}", rig.position());
        Ok(())
    }

    fn capture(&self, mut config: Config, formats: &[ImageFormat]) -> Result<(), String> {
        if !formats.is_empty() {
            config.capture.formats = formats.to_vec();
        }
        let mut connected = self.connect(&config, config.console.profile)?;
        let outcome = connected.rig.capture()?;
        for warning in &outcome.warnings {
            eprintln!("warning: {warning}");
        }
        println!("{}", format_capture_row(&outcome.record));
        if let Some(dir) = connected.rig.capture_dir(outcome.record.id) {
            println!("{}", dir.display());
        }
        Ok(())
    }

    /// Builds a rig from config and flags.
    ///
    /// Only an explicitly requested serial port that fails to open is
    /// fatal. A missing port, camera or capture directory is a notice.
    fn connect(&self, config: &Config, default_profile: ProfileName) -> Result<Connected, String> {
        let mut notices = Vec::new();
        let profile = self.profile.unwrap_or(default_profile);
        let controller = JogController::new(config.profiles.get(profile));

        let port = self.port.as_ref().or(config.serial.port.as_ref());
        let transport: Box<dyn Transport> = match port {
            Some(_) if self.dry_run => Box::new(DryRunTransport::default()),
            Some(path) => Box::new(
                SerialTransport::open(
                    path,
                    config.serial.baud,
                    config.serial.wake_up(),
                    config.serial.timeout(),
                )
                .map_err(|e| format!("failed to open serial port {path}: {e}"))?,
            ),
            None => {
                if !self.dry_run {
                    notices.push("No serial port configured; commands are only logged".into());
                }
                Box::new(DryRunTransport::default())
            }
        };

        let mut rig = Rig::new(controller, profile, transport);
        match open_camera(&config.capture) {
            Ok(camera) => rig = rig.with_camera(camera),
            Err(e) => notices.push(e.to_string()),
        }
        match config.capture.output_dir().map(Storage::new) {
            Some(Ok(storage)) => {
                rig = rig.with_storage(storage, CaptureSettings::from(&config.capture));
            }
            Some(Err(e)) => notices.push(format!("capture directory unavailable: {e}")),
            None => notices.push("could not determine a capture directory".into()),
        }

        info!(
            "rig ready: profile {profile}, link {}, camera {}",
            rig.transport_name(),
            rig.camera_name().as_deref().unwrap_or("none")
        );
        Ok(Connected { rig, notices })
    }
}

fn print_notices(notices: &[String]) {
    for notice in notices {
        eprintln!("{notice}");
    }
}

fn show_captures(config: &Config, id: Option<Uuid>) -> Result<(), String> {
    let root = config
        .capture
        .output_dir()
        .ok_or("could not determine a capture directory")?;
    let storage = Storage::new(root).map_err(|e| e.to_string())?;

    if let Some(id) = id {
        let record = storage.load_capture(id).map_err(|e| e.to_string())?;
        print!("{}", format_capture_detail(&record));
        println!("{}", storage.capture_dir(id).display());
        return Ok(());
    }

    let captures = storage.list_captures().map_err(|e| e.to_string())?;
    if captures.is_empty() {
        println!("No captures in {}", storage.root().display());
        return Ok(());
    }
    for record in &captures {
        println!("{}", format_capture_row(record));
    }
    Ok(())
}
