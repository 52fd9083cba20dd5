use log::{Level, LevelFilter, Metadata, Record};

/// Only records from the driver crates are shown at trace level.
const TRACE_PREFIX: &str = "kernel";

pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    // fails only if a logger is already installed, which keeps that one
    if log::set_logger(&StderrLogger).is_ok() {
        log::set_max_level(level);
    }
}

pub struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() < Level::Trace || metadata.target().starts_with(TRACE_PREFIX)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let color = match record.level() {
                Level::Error => "\x1b[1;31m",
                Level::Warn => "\x1b[1;33m",
                Level::Info => "\x1b[1;94m",
                Level::Debug => "\x1b[1;30m",
                Level::Trace => "\x1b[1;90m",
            };

            eprintln!(
                "{}{:5}\x1b[0m [{}] {}",
                color,
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        // no-op
    }
}
