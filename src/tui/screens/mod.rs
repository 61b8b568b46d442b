//! Screen rendering and input handling.

mod console;

pub use console::ConsoleScreen;
