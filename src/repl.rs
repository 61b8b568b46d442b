//! Serial prompt: a `> ` line interface with a continuous jog mode.
//!
//! Jog mode puts the terminal in raw mode and jogs every held axis once
//! per tick until Esc. It is the only place jogging is enabled in this
//! front end.

use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{execute, terminal};
use log::{debug, info};

use crate::config::JogModeConfig;
use crate::hold::{HoldTracker, Ticker};
use crate::keymap::{KeyAction, Keymap};
use crate::rig::{JogOutcome, Rig};

/// A parsed prompt line.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Jog,
    Position,
    Zero,
    Send(String),
    Capture,
    Help,
    Exit,
}

/// Parses one prompt line. Blank lines are `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));
    let command = match word {
        "" => return Ok(None),
        "j" | "jog" => ReplCommand::Jog,
        "pos" | "position" => ReplCommand::Position,
        "zero" => ReplCommand::Zero,
        "send" if rest.is_empty() => return Err("usage: send <line>".to_string()),
        "send" => ReplCommand::Send(rest.to_string()),
        "c" | "capture" => ReplCommand::Capture,
        "help" | "?" => ReplCommand::Help,
        "exit" | "quit" => ReplCommand::Exit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(command))
}

const HELP: &str = "\
Commands:
  j          enter jog mode
  pos        print the tracked position
  zero       reset the tracked position to zero
  send LINE  send a raw line to the controller
  capture    take a picture
  exit       quit";

/// Runs the prompt until `exit` or end of input.
pub fn run(rig: &mut Rig, settings: &JogModeConfig, notices: &[String]) -> io::Result<()> {
    for notice in notices {
        println!("{notice}");
    }
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next().transpose()? else {
            println!();
            return Ok(());
        };
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(ReplCommand::Exit)) => return Ok(()),
            Ok(Some(command)) => execute_command(rig, settings, command)?,
            Err(e) => eprintln!("{e}"),
        }
    }
}

fn execute_command(
    rig: &mut Rig,
    settings: &JogModeConfig,
    command: ReplCommand,
) -> io::Result<()> {
    match command {
        ReplCommand::Jog => jog_mode(rig, settings)?,
        ReplCommand::Position => println!("{}", rig.position()),
        ReplCommand::Zero => {
            rig.reset_position();
            println!("{}", rig.position());
        }
        ReplCommand::Send(line) => {
            if let Err(e) = rig.send_line(&line) {
                eprintln!("send failed: {e}");
            }
        }
        ReplCommand::Capture => report_capture(rig, "\n"),
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Exit => {}
    }
    Ok(())
}

fn report_capture(rig: &mut Rig, eol: &str) {
    match rig.capture() {
        Ok(outcome) => {
            let dir = rig
                .capture_dir(outcome.record.id)
                .map(|d| d.display().to_string())
                .unwrap_or_default();
            print!("captured {} -> {dir}{eol}", outcome.record.id);
            for warning in outcome.warnings {
                print!("  warning: {warning}{eol}");
            }
        }
        Err(e) => print!("{e}{eol}"),
    }
    let _ = io::stdout().flush();
}

/// Held-key state for one jog-mode session.
pub struct JogMode {
    keymap: Keymap,
    tracker: HoldTracker,
    ticker: Ticker,
}

impl JogMode {
    pub fn new(keymap: Keymap, tick: Duration, hold: Duration, now: Instant) -> Self {
        Self {
            keymap,
            tracker: HoldTracker::new(hold),
            ticker: Ticker::new(tick, now),
        }
    }

    /// Records a key event. Returns a non-jog action on key-down.
    pub fn on_key(&mut self, key: char, kind: KeyEventKind, now: Instant) -> Option<KeyAction> {
        match (self.keymap.action(key)?, kind) {
            (KeyAction::Jog(intent), KeyEventKind::Press | KeyEventKind::Repeat) => {
                self.tracker.press(intent, now);
                None
            }
            (KeyAction::Jog(intent), KeyEventKind::Release) => {
                self.tracker.release(intent);
                None
            }
            (action, KeyEventKind::Press) => Some(action),
            _ => None,
        }
    }

    pub fn until_next_tick(&self, now: Instant) -> Duration {
        self.ticker.until_next(now)
    }

    /// Jogs every held axis once if a tick is due.
    pub fn on_tick(&mut self, rig: &mut Rig, now: Instant) -> Vec<JogOutcome> {
        if !self.ticker.poll(now) {
            return Vec::new();
        }
        self.tracker
            .tick(now)
            .into_iter()
            .map(|intent| rig.jog(intent))
            .collect()
    }

    pub fn stop(&mut self) {
        self.tracker.clear();
    }
}

/// Restores the terminal however jog mode ends.
struct RawModeGuard {
    enhanced: bool,
}

impl RawModeGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        // Release events make held keys stop promptly; without them the
        // hold window decides.
        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        debug!("jog mode raw terminal, release events: {enhanced}");
        Ok(Self { enhanced })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
    }
}

fn jog_mode(rig: &mut Rig, settings: &JogModeConfig) -> io::Result<()> {
    println!("Use these keys to position the system:");
    for line in settings.keymap.help_lines() {
        println!("  * {line}");
    }
    for line in settings.keymap.command_help() {
        println!("  * {line}");
    }
    println!("Press escape to exit this mode.");

    let guard = RawModeGuard::enter()?;
    rig.set_enabled(true);
    let result = jog_loop(rig, settings);
    rig.set_enabled(false);
    drop(guard);

    info!("left jog mode at {}", rig.position());
    println!("{}", rig.position());
    result
}

fn jog_loop(rig: &mut Rig, settings: &JogModeConfig) -> io::Result<()> {
    let mut mode = JogMode::new(
        settings.keymap,
        settings.tick(),
        settings.hold(),
        Instant::now(),
    );
    loop {
        if event::poll(mode.until_next_tick(Instant::now()))?
            && let Event::Key(key) = event::read()?
        {
            match key.code {
                KeyCode::Esc => {
                    mode.stop();
                    return Ok(());
                }
                KeyCode::Char(c) => {
                    if mode.on_key(c, key.kind, Instant::now()) == Some(KeyAction::Capture) {
                        report_capture(rig, "\r\n");
                    }
                }
                _ => {}
            }
        }

        for outcome in mode.on_tick(rig, Instant::now()) {
            if let JogOutcome::SendFailed { command, error } = outcome {
                print!("send {command} failed: {error}\r\n");
            }
        }
    }
}
