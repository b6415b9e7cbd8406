/// File persistence for log lines
///
/// A single buffered writer shared by every logging call. Opening the file
/// is lazy so a disabled or unwritable log path never blocks console output.
use super::config::get_logger_config;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

static LOG_WRITER: Lazy<Mutex<Option<BufWriter<File>>>> = Lazy::new(|| Mutex::new(None));

/// Open (or create) the log file configured in `LoggerConfig`
pub fn init_file_logging() {
    let config = get_logger_config();
    if !config.file_enabled {
        return;
    }

    let path = Path::new(&config.file_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Failed to create log directory {}: {}", parent.display(), e);
                return;
            }
        }
    }

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            *LOG_WRITER.lock() = Some(BufWriter::new(file));
        }
        Err(e) => eprintln!("Failed to open log file {}: {}", path.display(), e),
    }
}

pub fn write_to_file(line: &str) {
    let mut writer = LOG_WRITER.lock();
    if let Some(w) = writer.as_mut() {
        if writeln!(w, "{}", line).is_err() {
            // Stop trying after the first failed write
            *writer = None;
        }
    }
}

pub fn flush_file_logging() {
    if let Some(w) = LOG_WRITER.lock().as_mut() {
        let _ = w.flush();
    }
}
