//! The operator-facing estimate of rig pose.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Axis;

/// Sum of all jog deltas applied since startup or the last reset.
///
/// A local estimate, not a measurement: nothing feeds hardware
/// position back into it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionState {
    pub theta: i32,
    pub phi: i32,
    pub h: i32,
    pub focus: i32,
}

impl PositionState {
    pub fn get(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Theta => self.theta,
            Axis::Phi => self.phi,
            Axis::H => self.h,
            Axis::Focus => self.focus,
        }
    }

    /// Adds `delta` to one axis, saturating at the `i32` bounds.
    ///
    /// Returns the delta actually applied.
    pub(crate) fn apply(&mut self, axis: Axis, delta: i32) -> i32 {
        let field = match axis {
            Axis::Theta => &mut self.theta,
            Axis::Phi => &mut self.phi,
            Axis::H => &mut self.h,
            Axis::Focus => &mut self.focus,
        };
        let before = *field;
        *field = before.saturating_add(delta);
        *field - before
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "θ={} φ={} h={} focus={}",
            self.theta, self.phi, self.h, self.focus
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_touches_only_one_axis() {
        let mut pos = PositionState::default();
        assert_eq!(pos.apply(Axis::Phi, -3), -3);

        assert_eq!(
            pos,
            PositionState {
                phi: -3,
                ..PositionState::default()
            }
        );
    }

    #[test]
    fn apply_saturates_and_reports_actual_delta() {
        let mut pos = PositionState {
            h: i32::MAX - 1,
            ..PositionState::default()
        };
        assert_eq!(pos.apply(Axis::H, 100), 1);
        assert_eq!(pos.h, i32::MAX);
        assert_eq!(pos.apply(Axis::H, 100), 0);
    }

    #[test]
    fn display_lists_all_axes() {
        let pos = PositionState {
            theta: 2,
            phi: -1,
            h: 1,
            focus: 0,
        };
        assert_eq!(pos.to_string(), "θ=2 φ=-1 h=1 focus=0");
    }
}
