//! Console screen: machine status, camera, status log and key help.

use std::collections::VecDeque;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Padding, Paragraph};

use crate::keymap::{KeyAction, Keymap};
use crate::model::{Axis, CaptureRecord};
use crate::rig::{JogOutcome, Rig};

const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
}

pub struct ConsoleScreen {
    keymap: Keymap,
    log: VecDeque<StatusLine>,
    last_capture: Option<CaptureRecord>,
}

impl ConsoleScreen {
    pub fn new(keymap: Keymap) -> Self {
        Self {
            keymap,
            log: VecDeque::new(),
            last_capture: None,
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(text.into(), false);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(text.into(), true);
    }

    fn push(&mut self, text: String, is_error: bool) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(StatusLine { text, is_error });
    }

    pub fn log(&self) -> impl Iterator<Item = &StatusLine> {
        self.log.iter()
    }

    pub fn action_for(&self, key: char) -> Option<KeyAction> {
        self.keymap.action(key)
    }

    /// Handles one key-down. Unmapped keys are ignored.
    pub fn on_key(&mut self, rig: &mut Rig, key: char) {
        let Some(action) = self.keymap.action(key) else {
            return;
        };
        match action {
            KeyAction::Jog(intent) => match rig.jog(intent) {
                JogOutcome::Ignored => {}
                JogOutcome::Sent(command) => self.info(format!("Sent {command}")),
                JogOutcome::LocalOnly(command) => self.info(format!("Moved {command}")),
                JogOutcome::SendFailed { command, error } => {
                    self.error(format!("Send {command} failed: {error}"));
                }
            },
            KeyAction::ToggleJog => {
                let enabled = !rig.is_enabled();
                rig.set_enabled(enabled);
                self.info(if enabled {
                    "Jogging enabled"
                } else {
                    "Jogging disabled"
                });
            }
            KeyAction::ResetPosition => {
                rig.reset_position();
                self.info("Position reset to zero");
            }
            KeyAction::Capture => match rig.capture() {
                Ok(outcome) => {
                    self.info(format!("Captured {}", outcome.record.id));
                    for warning in outcome.warnings {
                        self.error(warning);
                    }
                    self.last_capture = Some(outcome.record);
                }
                Err(e) => self.error(e),
            },
        }
    }

    pub fn render(&self, frame: &mut Frame, rig: &Rig) {
        let area = frame.area();

        let chunks = Layout::vertical([
            Constraint::Length(3), // title
            Constraint::Length(9), // status panels
            Constraint::Min(3),    // log
            Constraint::Length(1), // help
        ])
        .split(area);

        let title = Paragraph::new(Line::from(vec![Span::styled(
            "3-Axis Camera Controller",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )]))
        .block(Block::default().padding(Padding::new(2, 0, 1, 0)));
        frame.render_widget(title, chunks[0]);

        let panels =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(chunks[1]);
        frame.render_widget(
            Paragraph::new(machine_lines(rig)).block(panel("Machine Status")),
            panels[0],
        );
        frame.render_widget(
            Paragraph::new(self.camera_lines(rig)).block(panel("Camera")),
            panels[1],
        );

        // Newest at the bottom; only what fits.
        let visible = usize::from(chunks[2].height.saturating_sub(2));
        let skip = self.log.len().saturating_sub(visible);
        let log_lines: Vec<Line> = self
            .log()
            .skip(skip)
            .map(|line| {
                let color = if line.is_error { Color::Red } else { Color::Gray };
                Line::from(Span::styled(line.text.clone(), Style::default().fg(color)))
            })
            .collect();
        frame.render_widget(Paragraph::new(log_lines).block(panel("Status")), chunks[2]);

        let help = Paragraph::new(Line::from(vec![Span::styled(
            format!(" {}  esc quit", self.key_summary()),
            Style::default().fg(Color::DarkGray),
        )]));
        frame.render_widget(help, chunks[3]);
    }

    fn camera_lines(&self, rig: &Rig) -> Vec<Line<'static>> {
        let muted = Style::default().fg(Color::DarkGray);
        let Some(name) = rig.camera_name() else {
            return vec![Line::from(Span::styled(
                "No camera connected",
                Style::default().fg(Color::Red),
            ))];
        };
        let mut lines = vec![Line::from(name)];
        match &self.last_capture {
            Some(record) => {
                lines.push(Line::from(Span::styled("Last capture:", muted)));
                lines.push(Line::from(record.id.to_string()));
                lines.push(Line::from(record.position.to_string()));
                let formats: Vec<String> =
                    record.files.iter().map(|f| f.format.to_string()).collect();
                lines.push(Line::from(Span::styled(formats.join(", "), muted)));
            }
            None => lines.push(Line::from(Span::styled("No captures yet", muted))),
        }
        lines
    }

    /// The active keymap's help on one line.
    fn key_summary(&self) -> String {
        let mut parts = self.keymap.help_lines();
        parts.extend(self.keymap.command_help());
        parts.join("  ")
    }
}

fn machine_lines(rig: &Rig) -> Vec<Line<'static>> {
    let muted = Style::default().fg(Color::DarkGray);
    let position = rig.position();
    let steps = rig.controller().profile();

    let (state, color) = if rig.is_enabled() {
        ("ENABLED", Color::Green)
    } else {
        ("DISABLED", Color::Yellow)
    };
    let mut lines = vec![Line::from(vec![
        Span::styled("Jogging: ", muted),
        Span::styled(
            state,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ])];
    for axis in Axis::ALL {
        lines.push(Line::from(vec![
            Span::raw(format!("{:>6} = {:>8}", axis.label(), position.get(axis))),
            Span::styled(format!("  step {}", steps.magnitude(axis)), muted),
        ]));
    }
    lines.push(Line::from(Span::styled(
        format!("{} profile, {}", rig.profile(), rig.transport_name()),
        muted,
    )));
    lines
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} "))
        .padding(Padding::horizontal(1))
}
