//! Structured logging system for HackHub
//!
//! This module provides a small, ergonomic logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via --debug-<module> flags
//! - Dual output: colored console + file persistence
//!
//! ## Usage
//!
//! ```rust
//! use hackhub::logger::{self, LogTag};
//!
//! logger::error(LogTag::Database, "Failed to open store");
//! logger::warning(LogTag::Cache, "Cache write failed, continuing");
//! logger::info(LogTag::Webserver, "Listening on 127.0.0.1:8080");
//! logger::debug(LogTag::Realtime, "Subscription registered"); // Only if --debug-realtime
//! ```
//!
//! Call `logger::init()` once at startup before services start.

use crate::arguments::{is_quiet_enabled, is_verbose_enabled};

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{
    get_logger_config, init_from_args, set_logger_config, update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Parses command-line debug flags, then opens the log file.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Apply the `[logging]` section of the loaded configuration
///
/// Reopens the log file if the path changed. Command-line `--verbose` and
/// `--quiet` win over the configured level.
pub fn apply_settings(level: &str, file_enabled: bool, file_path: &str) {
    let parsed = level.parse::<LogLevel>();
    let flags_set_level = is_verbose_enabled() || is_quiet_enabled();
    update_logger_config(|cfg| {
        if let Ok(level) = &parsed {
            if !flags_set_level {
                cfg.min_level = *level;
            }
        }
        cfg.file_enabled = file_enabled;
        cfg.file_path = file_path.to_string();
    });
    file::init_file_logging();
    if let Err(e) = parsed {
        warning(LogTag::Config, &format!("Ignoring logging.level: {}", e));
    }
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level
///
/// Only shown when the --debug-<module> flag for this tag is present.
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (--verbose or --verbose-<module>)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush pending log writes (call during shutdown)
pub fn flush() {
    file::flush_file_logging();
}
