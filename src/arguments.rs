/// Centralized argument handling for HackHub
///
/// Command-line flags are stored once and queried from anywhere in the
/// process. Debug output is gated per subsystem with `--debug-<module>`.
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Overrides the stored arguments (used by tests)
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value that follows a flag (`--config path`)
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// DEBUG FLAGS
// =============================================================================

pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

pub fn is_debug_realtime_enabled() -> bool {
    has_arg("--debug-realtime")
}

pub fn is_debug_stars_enabled() -> bool {
    has_arg("--debug-stars")
}

pub fn is_debug_cache_enabled() -> bool {
    has_arg("--debug-cache")
}

pub fn is_debug_jobs_enabled() -> bool {
    has_arg("--debug-jobs")
}

pub fn is_debug_database_enabled() -> bool {
    has_arg("--debug-database")
}

pub fn is_debug_notifications_enabled() -> bool {
    has_arg("--debug-notifications")
}

pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

pub fn is_quiet_enabled() -> bool {
    has_arg("--quiet")
}

/// Path of the TOML config file, if overridden on the command line
pub fn config_path_override() -> Option<String> {
    get_arg_value("--config")
}

pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let mut modes = Vec::new();

    if is_debug_webserver_enabled() {
        modes.push("webserver");
    }
    if is_debug_realtime_enabled() {
        modes.push("realtime");
    }
    if is_debug_stars_enabled() {
        modes.push("stars");
    }
    if is_debug_cache_enabled() {
        modes.push("cache");
    }
    if is_debug_jobs_enabled() {
        modes.push("jobs");
    }
    if is_debug_database_enabled() {
        modes.push("database");
    }
    if is_debug_notifications_enabled() {
        modes.push("notifications");
    }

    modes
}

pub mod patterns {
    use super::has_arg;

    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }
}

pub fn print_help() {
    println!("HackHub - realtime event delivery and profile stars");
    println!();
    println!("USAGE:");
    println!("    hackhub [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    --config <path>           Load configuration from a TOML file");
    println!("    --help, -h                Show this help message");
    println!("    --verbose                 Enable verbose logging for every module");
    println!("    --quiet                   Only show warnings and errors");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug-webserver         HTTP routing and request handling");
    println!("    --debug-realtime          Event hub and SSE connections");
    println!("    --debug-stars             Star/unstar flow");
    println!("    --debug-cache             Cache reads and writes");
    println!("    --debug-jobs              Background job runner");
    println!("    --debug-database          SQLite store");
    println!("    --debug-notifications     Inbox notifications");
}

pub fn print_debug_info() {
    let enabled_modes = get_enabled_debug_modes();
    if enabled_modes.is_empty() {
        println!("No debug modes enabled");
    } else {
        println!("Enabled debug modes: {:?}", enabled_modes);
    }
}
