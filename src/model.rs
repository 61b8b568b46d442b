//! Core data model for rigjog.
//!
//! These types describe the rig as the operator sees it:
//! axes and jog intents, the tracked position, step profiles,
//! outgoing commands, and records of captured images.

mod capture;
mod command;
mod intent;
mod position;
mod profile;

pub use capture::{CaptureRecord, ImageFile, ImageFormat};
pub use command::Command;
pub use intent::{Axis, Direction, JogIntent};
pub use position::PositionState;
pub use profile::{ProfileName, StepProfile};
