//! Jog intents: which axis the operator wants to move, and which way.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A jog-able axis of the rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Axis {
    /// Stage rotation (θ).
    Theta,
    /// Carriage tilt along the track (φ).
    Phi,
    /// Camera height / nod (h).
    H,
    /// Lens focus. Tracked locally, never sent over the wire.
    Focus,
}

impl Axis {
    /// All axes, in display order.
    pub const ALL: [Self; 4] = [Self::Theta, Self::Phi, Self::H, Self::Focus];

    /// Short operator-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Theta => "θ",
            Self::Phi => "φ",
            Self::H => "h",
            Self::Focus => "focus",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which way to jog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    /// Applies this direction's sign to a positive magnitude.
    pub fn signed(self, magnitude: i32) -> i32 {
        match self {
            Self::Increase => magnitude,
            Self::Decrease => -magnitude,
        }
    }
}

/// A single discrete operator input: one key-down, one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JogIntent {
    pub axis: Axis,
    pub direction: Direction,
}

impl JogIntent {
    pub const fn new(axis: Axis, direction: Direction) -> Self {
        Self { axis, direction }
    }

    pub const fn increase(axis: Axis) -> Self {
        Self::new(axis, Direction::Increase)
    }

    pub const fn decrease(axis: Axis) -> Self {
        Self::new(axis, Direction::Decrease)
    }
}

impl fmt::Display for JogIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.direction {
            Direction::Increase => '+',
            Direction::Decrease => '-',
        };
        write!(f, "{}{sign}", self.axis)
    }
}
