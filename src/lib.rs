pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::config::{AdapterOptions, TomlConfig};
pub use crate::core::adapter::StorageProxyAdapter;
pub use crate::core::location::LocationPolicy;
pub use crate::core::upload::{Upload, UploadOptions};
pub use crate::domain::model::FileLocationConfig;
pub use crate::domain::ports::FilesAdapter;
pub use crate::utils::error::{AdapterError, Result};
