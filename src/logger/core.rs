/// Level and tag filtering in front of the formatter
use super::config::{get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Whether a message at `level` for `tag` gets written
///
/// Errors always pass. Debug output needs its tag switched on with
/// `--debug-<tag>` on top of the threshold. Verbose output ignores the
/// threshold unless the whole logger runs verbose; otherwise it needs
/// `--verbose-<tag>`. A non-empty tag allow-list narrows Warning and Info.
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    let config = get_logger_config();

    match level {
        LogLevel::Error => true,
        LogLevel::Verbose => {
            config.min_level == LogLevel::Verbose || is_verbose_enabled_for_tag(tag)
        }
        LogLevel::Debug => level <= config.min_level && is_debug_enabled_for_tag(tag),
        LogLevel::Warning | LogLevel::Info => {
            level <= config.min_level
                && (config.enabled_tags.is_empty()
                    || config.enabled_tags.contains(&tag.to_debug_key()))
        }
    }
}

pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if should_log(&tag, level) {
        super::format::format_and_log(tag, level.as_str(), message);
    }
}
