// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Simple stderr backend for the [`log`] crate.

use std::io::Write;

use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};

/// A simple logging backend that writes to stderr.
pub struct StderrLogger {
    /// The most verbose level that is printed.
    level: LevelFilter,
}

impl StderrLogger {
    /// Constructs a new [`StderrLogger`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Constructs a new [`StderrLogger`], leaks it, and installs it as the global logger.
    ///
    /// # Errors
    ///
    /// May return an `Error` if a logger was already installed.
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(Box::leak(Box::new(Self::new(level))))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Default for StderrLogger {
    fn default() -> Self {
        Self::new(LevelFilter::Warn)
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let time = Local::now().format("%H:%M:%S%.3f");
            let level = record.level();
            let file = record.file().unwrap_or_default();
            let line = record.line().unwrap_or_default();
            let args = record.args();
            let _ = writeln!(
                std::io::stderr().lock(),
                "[{time} {level} {file}:{line}] - {args}"
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Parses a [`LevelFilter`] from its lowercase name, such as `warn` or `debug`.
#[must_use = "Has no effect if the result is unused"]
pub fn level_from_str(level: &str) -> Option<LevelFilter> {
    match level {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}
