//! Configuration: types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{
    default_config_path, default_index_path, default_lock_dir, default_log_path, default_sync_state_path,
    path_has_symlink_ancestor,
};
pub use types::{Config, LogLevel};
pub use xml::{create_template_config, load_config_from_xml_path, load_or_init, LoadResult};

/// Environment variable naming an explicit config file (or a directory holding config.xml).
pub const CONFIG_ENV: &str = "STORAGE_MIGRATE_CONFIG";
pub const DATA_FOLDER_DEFAULT: &str = "data";
pub const DEFAULT_AUTHORITY: &str = "local";
