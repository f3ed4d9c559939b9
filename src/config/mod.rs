//! Configuration: types, default paths, XML loading, and validation.
//! Values come from built-in defaults, then config.xml, then CLI flags.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{CONFIG_ENV_VAR, default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use xml::{create_template_config, load_config, load_config_from_xml_path};

/// Copy chunk bounds accepted by `Config::validate`.
pub const MIN_COPY_CHUNK: usize = 4 * 1024;
pub const MAX_COPY_CHUNK: usize = 16 * 1024 * 1024;
