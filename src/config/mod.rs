#[cfg(feature = "cli")]
pub mod cli;
pub mod options;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use options::AdapterOptions;
pub use toml_config::TomlConfig;
