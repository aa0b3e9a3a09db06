//! Configuration for capture runs.
//!
//! Handles loading, validating and saving [`CaptureConfig`] files in YAML or
//! TOML, and resolving the paths they contain.

mod loader;
mod path;
mod schema;

pub use loader::{
    ConfigFormat, default_config_path, load_config, load_config_from_str, load_or_default,
    locate_config, save_config,
};
pub use path::{PathResolver, expand_home, home_dir, resolve_path};
pub use schema::{CaptureConfig, DEFAULT_LOG_NAME, MAX_BRACKET_OFFSETS};
