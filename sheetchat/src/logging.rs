//! Minimal stderr logger for the `log` facade

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Environment variable overriding the `-v` verbosity (`error`, `warn`, `info`, `debug`, `trace`, `off`)
pub const LOG_ENV: &str = "SHEETCHAT_LOG";

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let label = match record.level() {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN".yellow().bold(),
            Level::Info => "INFO".blue().bold(),
            Level::Debug => "DEBUG".bright_black(),
            Level::Trace => "TRACE".bright_black(),
        };
        eprintln!("{} [{}] {}", label, record.target().bright_black(), record.args());
    }

    fn flush(&self) {}
}

/// Level for a `-v` count: warnings by default, then info, debug, trace
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn init(verbosity: u8) {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or_else(|| level_for(verbosity));

    // A logger may already be installed when embedded; keep it
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
