//! Outgoing motion commands.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Axis;

/// Move one axis by a signed distance, relative to where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub axis: Axis,
    pub distance: i32,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:+}", self.axis, self.distance)
    }
}
