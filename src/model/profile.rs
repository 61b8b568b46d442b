//! Step profiles: how far one jog moves each axis.
//!
//! The console and the serial front ends were built against different
//! units (display units vs. encoder counts) and no conversion between
//! them is known, so each is kept as its own named profile.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::Axis;

/// Per-axis step magnitudes. Always positive; direction supplies the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StepProfile {
    pub theta: i32,
    pub phi: i32,
    pub h: i32,
    pub focus: i32,
}

impl StepProfile {
    /// One display unit per keypress.
    pub const CONSOLE: Self = Self {
        theta: 1,
        phi: 1,
        h: 1,
        focus: 1,
    };

    /// Encoder counts per tick: stage 100, track 1000, nod 100.
    pub const SERIAL: Self = Self {
        theta: 100,
        phi: 1000,
        h: 100,
        focus: 1,
    };

    pub fn magnitude(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Theta => self.theta,
            Axis::Phi => self.phi,
            Axis::H => self.h,
            Axis::Focus => self.focus,
        }
    }

    /// The first axis whose magnitude is not positive, if any.
    pub fn invalid_axis(&self) -> Option<Axis> {
        Axis::ALL.into_iter().find(|&axis| self.magnitude(axis) < 1)
    }
}

/// The built-in profiles a deployment can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileName {
    /// The keyboard console: degrees and millimeters.
    Console,
    /// The serial microcontroller: encoder units.
    Serial,
}

impl ProfileName {
    pub fn builtin(self) -> StepProfile {
        match self {
            Self::Console => StepProfile::CONSOLE,
            Self::Serial => StepProfile::SERIAL,
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Console => "console",
            Self::Serial => "serial",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_are_valid() {
        assert_eq!(StepProfile::CONSOLE.invalid_axis(), None);
        assert_eq!(StepProfile::SERIAL.invalid_axis(), None);
    }

    #[test]
    fn serial_profile_uses_encoder_steps() {
        let p = ProfileName::Serial.builtin();
        assert_eq!(p.magnitude(Axis::Theta), 100);
        assert_eq!(p.magnitude(Axis::Phi), 1000);
        assert_eq!(p.magnitude(Axis::H), 100);
    }

    #[test]
    fn zero_step_is_invalid() {
        let p = StepProfile {
            h: 0,
            ..StepProfile::CONSOLE
        };
        assert_eq!(p.invalid_axis(), Some(Axis::H));
    }
}
