//! The jog controller: operator intents in, position updates and commands out.
//!
//! Pure translation. The controller never performs I/O; callers hand the
//! returned [`Command`] to a transport. Position tracking is optimistic:
//! a command lost downstream leaves the estimate ahead of the hardware,
//! and nothing here detects or corrects that.

use crate::model::{Command, JogIntent, PositionState, StepProfile};

/// Owns the position estimate and the jog enablement gate.
#[derive(Debug, Clone)]
pub struct JogController {
    profile: StepProfile,
    position: PositionState,
    enabled: bool,
}

impl JogController {
    /// A controller at the origin with jogging disabled.
    pub fn new(profile: StepProfile) -> Self {
        Self {
            profile,
            position: PositionState::default(),
            enabled: false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn position(&self) -> PositionState {
        self.position
    }

    pub fn profile(&self) -> &StepProfile {
        &self.profile
    }

    /// Zeroes the position estimate. Emits nothing.
    pub fn reset(&mut self) {
        self.position = PositionState::default();
    }

    /// Applies one intent.
    ///
    /// Returns a command exactly when the position changed, carrying the
    /// same signed delta that was applied. Disabled controllers discard
    /// every intent.
    pub fn handle_intent(&mut self, intent: JogIntent) -> Option<Command> {
        if !self.enabled {
            return None;
        }
        let delta = intent
            .direction
            .signed(self.profile.magnitude(intent.axis));
        let applied = self.position.apply(intent.axis, delta);
        (applied != 0).then_some(Command {
            axis: intent.axis,
            distance: applied,
        })
    }
}
