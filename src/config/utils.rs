/// Configuration utilities - loading, reloading, and access helpers
///
/// The global CONFIG is the single source of truth at runtime. Components
/// take their own section by value at construction, so nothing below is
/// needed to build them in tests.
use super::schemas::Config;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::path::Path;

use crate::logger::{self, LogTag};

/// Global configuration instance
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Load configuration from disk and initialize the global CONFIG
///
/// If the file doesn't exist, the schema defaults are used.
pub fn load_config() -> Result<(), String> {
    load_config_from_path(CONFIG_FILE_PATH)
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &str) -> Result<(), String> {
    let config = read_config_file(path)?;

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(())
}

/// Parse a config file without touching the global (missing file = defaults)
pub fn read_config_file(path: &str) -> Result<Config, String> {
    if !Path::new(path).exists() {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;

    toml::from_str::<Config>(&contents)
        .map_err(|e| format!("Failed to parse config file '{}': {}", path, e))
}

/// Reload configuration from disk
///
/// Only settings read per request pick up the change; listeners, stores
/// and the hub keep the values they were built with.
pub fn reload_config_from_path(path: &str) -> Result<(), String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;

    let new_config = toml::from_str::<Config>(&contents)
        .map_err(|e| format!("Failed to parse config file '{}': {}", path, e))?;

    match CONFIG.get() {
        Some(config_lock) => {
            *config_lock.write() = new_config;
            Ok(())
        }
        None => Err("Config not initialized. Call load_config() first.".to_string()),
    }
}

/// Execute a function with read access to the configuration
///
/// Falls back to defaults when nothing was loaded yet.
///
/// ```
/// use hackhub::config::with_config;
///
/// let port = with_config(|cfg| cfg.webserver.port);
/// ```
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let config_lock = CONFIG.get_or_init(|| RwLock::new(Config::default()));
    let config = config_lock.read();
    f(&config)
}

/// Get a clone of the entire configuration (for use across await points)
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_config_file_missing_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = read_config_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.webserver.port, 8080);
    }

    #[test]
    fn test_read_config_file_parses_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[realtime]\nheartbeat_interval_ms = 1000\n\n[jobs]\nmax_attempts = 7"
        )
        .unwrap();

        let config = read_config_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.realtime.heartbeat_interval_ms, 1000);
        assert_eq!(config.realtime.connection_ttl_ms, 3_600_000);
        assert_eq!(config.jobs.max_attempts, 7);
    }

    #[test]
    fn test_read_config_file_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[realtime\nheartbeat_interval_ms = ").unwrap();
        let err = read_config_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.contains("Failed to parse config file"));
    }
}
