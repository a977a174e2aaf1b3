use crate::domain::model::FileLocationConfig;
use crate::utils::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// File operations exposed to the application server.
#[async_trait]
pub trait FilesAdapter: Send + Sync {
    async fn create_file(&self, filename: &str, data: Bytes, content_type: &str) -> Result<()>;
    async fn delete_file(&self, filename: &str) -> Result<String>;
    async fn get_file_data(&self, filename: &str) -> Result<Vec<u8>>;
    fn get_file_location(&self, config: &FileLocationConfig, filename: &str) -> String;
}
