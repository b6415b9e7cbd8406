/// Logger configuration and per-tag debug switches
///
/// Populated once from command-line arguments at startup; tests and the
/// config loader may adjust it later through `update_logger_config`.
use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::{get_cmd_args, is_quiet_enabled, is_verbose_enabled};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Messages above this level are dropped
    pub min_level: LogLevel,

    /// If non-empty, only these tags are shown (debug keys)
    pub enabled_tags: HashSet<String>,

    /// Tags with --debug-<key>
    pub debug_tags: HashSet<String>,

    /// Tags with --verbose-<key>
    pub verbose_tags: HashSet<String>,

    /// Mirror console lines into the log file
    pub file_enabled: bool,

    /// Log file location
    pub file_path: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Debug,
            enabled_tags: HashSet::new(),
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            file_enabled: true,
            file_path: "logs/hackhub.log".to_string(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

pub fn update_logger_config<F: FnOnce(&mut LoggerConfig)>(f: F) {
    f(&mut LOGGER_CONFIG.write());
}

/// Scan command-line arguments for --debug-<key>, --verbose-<key>, --verbose, --quiet
pub fn init_from_args() {
    let args = get_cmd_args();
    update_logger_config(|cfg| {
        for arg in &args {
            if let Some(key) = arg.strip_prefix("--debug-") {
                cfg.debug_tags.insert(key.to_lowercase());
            } else if let Some(key) = arg.strip_prefix("--verbose-") {
                cfg.verbose_tags.insert(key.to_lowercase());
            }
        }
        if is_verbose_enabled() {
            cfg.min_level = LogLevel::Verbose;
        }
        if is_quiet_enabled() {
            cfg.min_level = LogLevel::Warning;
        }
    });
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().debug_tags.contains(&tag.to_debug_key())
}

pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().verbose_tags.contains(&tag.to_debug_key())
}
