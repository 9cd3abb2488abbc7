//! Explicit logger handle.
//!
//! Every component that logs owns a copy of a [`Logger`] and consults its
//! level before emitting a `tracing` event, so verbosity is set per binding
//! or per CLI rather than through process-wide state.

use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Level {
    Silent,
    #[default]
    Info,
    Debug,
    Trace,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Silent => "silent",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        f.write_str(s)
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" | "off" => Ok(Level::Silent),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            "trace" => Ok(Level::Trace),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> Self {
        match level {
            Level::Silent => LevelFilter::OFF,
            Level::Info => LevelFilter::INFO,
            Level::Debug => LevelFilter::DEBUG,
            Level::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Logger {
    level: Level,
}

impl Logger {
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    pub fn silent() -> Self {
        Self::new(Level::Silent)
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level != Level::Silent && level <= self.level
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        if self.enabled(Level::Debug) {
            tracing::debug!(target: "fncli", "{}", args);
        }
    }

    pub fn trace(&self, args: fmt::Arguments<'_>) {
        if self.enabled(Level::Trace) {
            tracing::trace!(target: "fncli", "{}", args);
        }
    }
}
