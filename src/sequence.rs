//! Capture sequences: scripted jogs, pauses and captures.
//!
//! A sequence file is TOML with one `[[step]]` table per step, each
//! holding exactly one of:
//!
//! ```toml
//! [[step]]
//! jog = { axis = "theta", direction = "increase", count = 10 }
//!
//! [[step]]
//! settle-ms = 500
//!
//! [[step]]
//! capture = true
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::Deserialize;
use uuid::Uuid;

use crate::model::{Axis, Direction, JogIntent};
use crate::rig::{JogOutcome, Rig};

/// One step of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Jog { intent: JogIntent, count: u32 },
    Settle(Duration),
    Capture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub steps: Vec<Step>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SequenceFile {
    #[serde(default)]
    step: Vec<StepTable>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct StepTable {
    jog: Option<JogTable>,
    settle_ms: Option<u64>,
    capture: Option<bool>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct JogTable {
    axis: Axis,
    direction: Direction,
    #[serde(default = "one")]
    count: u32,
}

fn one() -> u32 {
    1
}

impl StepTable {
    fn into_step(self, index: usize) -> Result<Step, String> {
        let n = index + 1;
        match (self.jog, self.settle_ms, self.capture) {
            (Some(jog), None, None) => {
                if jog.count == 0 {
                    return Err(format!("step {n}: jog count must be at least 1"));
                }
                Ok(Step::Jog {
                    intent: JogIntent::new(jog.axis, jog.direction),
                    count: jog.count,
                })
            }
            (None, Some(ms), None) => Ok(Step::Settle(Duration::from_millis(ms))),
            (None, None, Some(true)) => Ok(Step::Capture),
            (None, None, Some(false)) => Err(format!("step {n}: `capture = false` does nothing")),
            (None, None, None) => Err(format!("step {n}: empty step")),
            _ => Err(format!("step {n}: set exactly one of `jog`, `settle-ms`, `capture`")),
        }
    }
}

impl Sequence {
    pub fn parse(contents: &str) -> Result<Self, String> {
        let file: SequenceFile =
            toml::from_str(contents).map_err(|e| format!("invalid sequence: {e}"))?;
        let steps = file
            .step
            .into_iter()
            .enumerate()
            .map(|(i, table)| table.into_step(i))
            .collect::<Result<Vec<_>, _>>()?;
        if steps.is_empty() {
            return Err("sequence has no steps".to_string());
        }
        Ok(Self { steps })
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Self::parse(&contents).map_err(|e| format!("{}: {e}", path.display()))
    }
}

/// What a sequence run did.
#[derive(Debug, Default)]
pub struct SequenceReport {
    pub commands_sent: usize,
    pub captures: Vec<Uuid>,
    pub capture_errors: Vec<String>,
    /// Set when a send failed and the run stopped.
    pub aborted: Option<String>,
}

/// Runs a sequence with jogging enabled.
///
/// Stops at the first failed send: later steps assume the rig moved.
/// Failed captures are recorded and the run continues. Enablement is
/// restored afterwards.
pub fn run(
    rig: &mut Rig,
    sequence: &Sequence,
    mut sleep: impl FnMut(Duration),
) -> SequenceReport {
    let was_enabled = rig.is_enabled();
    rig.set_enabled(true);
    let mut report = SequenceReport::default();

    'steps: for (i, step) in sequence.steps.iter().enumerate() {
        info!("sequence step {}/{}: {step:?}", i + 1, sequence.steps.len());
        match *step {
            Step::Jog { intent, count } => {
                for _ in 0..count {
                    match rig.jog(intent) {
                        JogOutcome::Sent(_) => report.commands_sent += 1,
                        JogOutcome::LocalOnly(_) | JogOutcome::Ignored => {}
                        JogOutcome::SendFailed { command, error } => {
                            warn!("sequence aborted at step {}", i + 1);
                            report.aborted =
                                Some(format!("step {}: send {command} failed: {error}", i + 1));
                            break 'steps;
                        }
                    }
                }
            }
            Step::Settle(duration) => sleep(duration),
            Step::Capture => match rig.capture() {
                Ok(outcome) => {
                    report.captures.push(outcome.record.id);
                    report.capture_errors.extend(outcome.warnings);
                }
                Err(e) => report.capture_errors.push(format!("step {}: {e}", i + 1)),
            },
        }
    }

    rig.set_enabled(was_enabled);
    report
}
