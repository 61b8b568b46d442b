mod capture;
mod cli;
mod config;
mod hold;
mod jog;
mod keymap;
mod logging;
mod model;
mod repl;
mod rig;
mod sequence;
mod storage;
mod transport;
mod tui;

use std::process;

use clap::Parser;
use log::info;

use cli::Cli;
use logging::LogTarget;

fn main() {
    let cli = Cli::parse();

    let target = if cli.command.is_interactive() {
        LogTarget::File
    } else {
        LogTarget::Stderr
    };
    match logging::init(target) {
        Ok(Some(path)) => info!(
            "rigjog {} logging to {}",
            env!("CARGO_PKG_VERSION"),
            path.display()
        ),
        Ok(None) => {}
        Err(e) => eprintln!("Logging disabled: {e}"),
    }

    if let Err(e) = cli.run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
