use serde::{Deserialize, Serialize};

/// Deployment-specific values used to build proxied file URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLocationConfig {
    pub mount: String,
    pub application_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub filename: String,
    pub filetype: String,
}

impl UploadMetadata {
    /// Metadata pairs in the order they are sent to the upload endpoint.
    pub fn pairs(&self) -> [(&'static str, &str); 2] {
        [("filename", &self.filename), ("filetype", &self.filetype)]
    }
}
