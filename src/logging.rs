//! File logging.
//!
//! The terminal belongs to the display while the show runs, so everything is
//! written to `lumiere_*.log` instead. `RUST_LOG` overrides the default level.

use std::path::Path;

use anyhow::{Context, Result};
use flexi_logger::{DeferredNow, FileSpec, Logger, LoggerHandle, Record};

/// Start logging into `dir`. Keep the returned handle alive until exit so
/// buffered lines are flushed.
pub fn setup(dir: &Path) -> Result<LoggerHandle> {
    Logger::try_with_env_or_str("info")
        .context("invalid RUST_LOG value")?
        .log_to_file(FileSpec::default().directory(dir).basename("lumiere"))
        .format(line_format)
        .start()
        .with_context(|| format!("unable to start logging into {}", dir.display()))
}

/// `LEVEL [time] [file:line] message`
pub fn line_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{:<5} [{}] [{}:{}] {}",
        record.level(),
        now.now().format("%H:%M:%S%.6f"),
        record.file().unwrap_or("<unnamed>"),
        record.line().unwrap_or(0),
        record.args()
    )
}
