//! Terminal console: one jog per keypress, with position and status panels.

mod app;
mod screens;

pub use app::run;
