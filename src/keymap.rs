//! Static key tables: which key does what.
//!
//! Each front end runs exactly one keymap. The console and serial tables
//! disagree on the sign of θ and h; they are kept apart rather than
//! reconciled, and configuration picks one.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::model::{Axis, JogIntent};

/// What a key asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Jog(JogIntent),
    Capture,
    ToggleJog,
    ResetPosition,
}

/// The selectable key tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Keymap {
    Console,
    Serial,
}

const CONSOLE: &[(char, KeyAction)] = &[
    ('a', KeyAction::Jog(JogIntent::decrease(Axis::Theta))),
    ('d', KeyAction::Jog(JogIntent::increase(Axis::Theta))),
    ('w', KeyAction::Jog(JogIntent::increase(Axis::Phi))),
    ('s', KeyAction::Jog(JogIntent::decrease(Axis::Phi))),
    ('q', KeyAction::Jog(JogIntent::increase(Axis::H))),
    ('e', KeyAction::Jog(JogIntent::decrease(Axis::H))),
    ('+', KeyAction::Jog(JogIntent::increase(Axis::Focus))),
    ('=', KeyAction::Jog(JogIntent::increase(Axis::Focus))),
    ('-', KeyAction::Jog(JogIntent::decrease(Axis::Focus))),
    ('c', KeyAction::Capture),
    (' ', KeyAction::ToggleJog),
    ('0', KeyAction::ResetPosition),
];

const SERIAL: &[(char, KeyAction)] = &[
    ('a', KeyAction::Jog(JogIntent::increase(Axis::Theta))),
    ('d', KeyAction::Jog(JogIntent::decrease(Axis::Theta))),
    ('w', KeyAction::Jog(JogIntent::increase(Axis::Phi))),
    ('s', KeyAction::Jog(JogIntent::decrease(Axis::Phi))),
    ('e', KeyAction::Jog(JogIntent::increase(Axis::H))),
    ('q', KeyAction::Jog(JogIntent::decrease(Axis::H))),
    ('c', KeyAction::Capture),
];

impl Keymap {
    fn table(self) -> &'static [(char, KeyAction)] {
        match self {
            Self::Console => CONSOLE,
            Self::Serial => SERIAL,
        }
    }

    /// Looks up a key. Letters match regardless of case.
    pub fn action(self, key: char) -> Option<KeyAction> {
        let key = key.to_ascii_lowercase();
        self.table()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, action)| *action)
    }

    /// The key bound to an action, if any.
    pub fn key_for(self, action: KeyAction) -> Option<char> {
        self.table()
            .iter()
            .find(|(_, a)| *a == action)
            .map(|(k, _)| *k)
    }

    pub fn binds(self, action: KeyAction) -> bool {
        self.key_for(action).is_some()
    }

    /// Help for the bound non-jog keys, e.g. `space jog on/off`.
    pub fn command_help(self) -> Vec<String> {
        [
            (KeyAction::ToggleJog, "jog on/off"),
            (KeyAction::Capture, "capture"),
            (KeyAction::ResetPosition, "zero"),
        ]
        .into_iter()
        .filter_map(|(action, label)| {
            let key = self.key_for(action)?;
            Some(format!("{} {label}", key_name(key)))
        })
        .collect()
    }

    /// One line per axis describing its keys, e.g. `θ: d+ a-`.
    pub fn help_lines(self) -> Vec<String> {
        Axis::ALL
            .into_iter()
            .filter_map(|axis| {
                let up = self.key_for(KeyAction::Jog(JogIntent::increase(axis)))?;
                let down = self.key_for(KeyAction::Jog(JogIntent::decrease(axis)))?;
                Some(format!(
                    "{axis}: {}+ {}-",
                    up.to_ascii_uppercase(),
                    down.to_ascii_uppercase()
                ))
            })
            .collect()
    }
}

impl fmt::Display for Keymap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Console => "console",
            Self::Serial => "serial",
        })
    }
}

fn key_name(key: char) -> String {
    match key {
        ' ' => "space".to_string(),
        other => other.to_ascii_uppercase().to_string(),
    }
}
