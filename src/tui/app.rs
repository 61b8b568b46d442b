//! Application loop for the console.

use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::info;
use ratatui::DefaultTerminal;

use crate::keymap::{KeyAction, Keymap};
use crate::rig::Rig;

use super::screens::ConsoleScreen;

/// Runs the console event loop until the operator presses Esc.
///
/// `notices` are shown in the status log on start, e.g. a missing camera.
pub fn run(rig: &mut Rig, keymap: Keymap, notices: &[String]) -> io::Result<()> {
    let mut screen = ConsoleScreen::new(keymap);
    for notice in notices {
        screen.error(notice.clone());
    }
    screen.info("Jogging is disabled; press space to enable");

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, rig, &mut screen);
    ratatui::restore();
    info!("console closed at {}", rig.position());
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    rig: &mut Rig,
    screen: &mut ConsoleScreen,
) -> io::Result<()> {
    loop {
        terminal.draw(|frame| screen.render(frame, rig))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        // One intent per key-down: repeats and releases are not jogs.
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Esc => return Ok(()),
            KeyCode::Char(c) => {
                // Capturing blocks until the camera answers; show that first.
                if screen.action_for(c) == Some(KeyAction::Capture) {
                    screen.info("Capturing...");
                    terminal.draw(|frame| screen.render(frame, rig))?;
                }
                screen.on_key(rig, c);
            }
            _ => {}
        }
    }
}
