pub mod adapter;
pub mod location;
pub mod upload;

pub use crate::domain::model::{FileLocationConfig, UploadMetadata};
pub use crate::domain::ports::FilesAdapter;
pub use crate::utils::error::Result;
