//! Logger setup.
//!
//! The console and the prompt own the terminal, so they log to a file:
//! `$RIGJOG_LOG`, else `~/.rigjog/rigjog.log`. One-shot commands log to
//! stderr. `RUST_LOG` overrides the default level either way.

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use env_logger::{Builder, Env, Target};

use crate::config;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    File,
    Stderr,
}

pub fn log_path() -> Option<PathBuf> {
    env::var_os("RIGJOG_LOG")
        .map(PathBuf::from)
        .or_else(|| config::home_dir().map(|h| h.join("rigjog.log")))
}

fn open_log(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global logger. Returns the log file path when logging
/// to a file.
pub fn init(target: LogTarget) -> Result<Option<PathBuf>, String> {
    match target {
        LogTarget::Stderr => {
            Builder::from_env(Env::default().default_filter_or("warn")).init();
            Ok(None)
        }
        LogTarget::File => {
            let path = log_path().ok_or("could not determine a log file location")?;
            let file = open_log(&path)
                .map_err(|e| format!("failed to open log {}: {e}", path.display()))?;
            Builder::from_env(Env::default().default_filter_or("info"))
                .target(Target::Pipe(Box::new(file)))
                .init();
            Ok(Some(path))
        }
    }
}
