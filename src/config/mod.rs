//! Configuration system
//!
//! - `macros`: `config_struct!` for single-declaration structs with defaults
//! - `schemas`: every section of `config.toml`
//! - `utils`: global load/reload/access helpers

pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::{
    get_config_clone, load_config, load_config_from_path, read_config_file,
    reload_config_from_path, with_config, CONFIG_FILE_PATH,
};
