//! CLI module containing argument parsing, config file loading and validation

pub mod args;
pub mod config;
pub mod validation;

pub use args::{Args, RunSettings};
pub use config::{default_config_path, load_config, ConfigError, ConfigFile};
