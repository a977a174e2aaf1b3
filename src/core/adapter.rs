use crate::config::options::{
    normalize_chunk_size, normalize_proxy_url, normalize_retry_delays, AdapterOptions,
};
use crate::core::location::LocationPolicy;
use crate::core::upload::{ErrorCallback, ProgressCallback, SuccessCallback, Upload, UploadOptions};
use crate::domain::model::{FileLocationConfig, UploadMetadata};
use crate::domain::ports::FilesAdapter;
use crate::utils::error::{AdapterError, Result};
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

pub const APPLICATION_ID_HEADER: &str = "X-Parse-Application-Id";
pub const MASTER_KEY_HEADER: &str = "X-Parse-Master-key";

/// Everything needed to build one upload session.
pub struct NewUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
    pub on_progress: ProgressCallback,
    pub on_success: SuccessCallback,
    pub on_error: ErrorCallback,
}

/// Proxies file operations to the storage proxy and resolves public file URLs.
#[derive(Clone)]
pub struct StorageProxyAdapter {
    app_id: String,
    master_key: String,
    proxy_url: String,
    bucket_prefix: String,
    location: LocationPolicy,
    retry_delays: Vec<u64>,
    chunk_size: usize,
    client: Client,
}

impl fmt::Debug for StorageProxyAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageProxyAdapter")
            .field("app_id", &self.app_id)
            .field("master_key", &"<redacted>")
            .field("proxy_url", &self.proxy_url)
            .field("bucket_prefix", &self.bucket_prefix)
            .field("location", &self.location)
            .field("retry_delays", &self.retry_delays)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl StorageProxyAdapter {
    pub fn new(options: AdapterOptions) -> Self {
        Self::with_client(options, Client::new())
    }

    pub fn with_client(options: AdapterOptions, client: Client) -> Self {
        Self {
            proxy_url: normalize_proxy_url(&options.proxy_url),
            retry_delays: normalize_retry_delays(options.retry_delays.as_deref()),
            chunk_size: normalize_chunk_size(options.chunk_size),
            location: LocationPolicy::from_options(&options),
            bucket_prefix: options.bucket_prefix.unwrap_or_default(),
            app_id: options.app_id,
            master_key: options.master_key,
            client,
        }
    }

    pub fn proxy_url(&self) -> &str {
        &self.proxy_url
    }

    pub fn retry_delays(&self) -> &[u64] {
        &self.retry_delays
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn bucket_prefix(&self) -> &str {
        &self.bucket_prefix
    }

    pub fn location_policy(&self) -> &LocationPolicy {
        &self.location
    }

    fn auth_headers(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (APPLICATION_ID_HEADER.to_string(), self.app_id.clone()),
            (MASTER_KEY_HEADER.to_string(), self.master_key.clone()),
        ])
    }

    async fn post_form(&self, endpoint: &str, filename: &str) -> Result<Response> {
        let url = format!("{}{}", self.proxy_url, endpoint);
        tracing::debug!("POST {} for '{}'", url, filename);

        let response = self
            .client
            .post(&url)
            .header(APPLICATION_ID_HEADER, &self.app_id)
            .header(MASTER_KEY_HEADER, &self.master_key)
            .form(&[("file", filename)])
            .send()
            .await?;

        tracing::debug!("{} responded with {}", endpoint, response.status());
        if response.status() != StatusCode::OK {
            return Err(AdapterError::from_status(response.status()));
        }

        Ok(response)
    }

    /// Builds an upload session for `request` without starting it.
    pub fn new_upload(&self, request: NewUpload) -> Upload {
        let options = UploadOptions {
            endpoint: format!("{}files/", self.proxy_url),
            retry_delays: self.retry_delays.clone(),
            chunk_size: self.chunk_size,
            metadata: UploadMetadata {
                filename: format!("{}{}", self.bucket_prefix, request.filename),
                filetype: request.content_type,
            },
            headers: self.auth_headers(),
            on_progress: request.on_progress,
            on_success: request.on_success,
            on_error: request.on_error,
        };

        Upload::new(self.client.clone(), request.data, options)
    }

    /// Uploads `data` through a resumable session and waits for it to finish.
    pub async fn create_file(
        &self,
        filename: &str,
        data: impl Into<Bytes>,
        content_type: &str,
    ) -> Result<()> {
        let (sender, outcome) = oneshot::channel();
        let settlement = Arc::new(Settlement(Mutex::new(Some(sender))));

        let on_success: SuccessCallback = {
            let settlement = Arc::clone(&settlement);
            Arc::new(move || settlement.settle(Ok(())))
        };
        let on_error: ErrorCallback =
            Arc::new(move |err: AdapterError| settlement.settle(Err(err)));

        let name = filename.to_string();
        let on_progress: ProgressCallback = Arc::new(move |uploaded: u64, total: u64| {
            if let Some(percentage) = progress_percentage(uploaded, total) {
                tracing::debug!("Uploading '{}': {}%", name, percentage);
            }
        });

        let upload = self.new_upload(NewUpload {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data: data.into(),
            on_progress,
            on_success,
            on_error,
        });
        upload.start();

        outcome.await.unwrap_or_else(|_| {
            Err(AdapterError::UploadError {
                message: "upload session ended without reporting a result".to_string(),
            })
        })
    }

    /// Deletes a stored file and returns the proxy's response body.
    pub async fn delete_file(&self, filename: &str) -> Result<String> {
        let response = self.post_form("deleteFile", filename).await?;
        Ok(response.text().await?)
    }

    pub async fn get_file_data(&self, filename: &str) -> Result<Vec<u8>> {
        let response = self.post_form("getObject", filename).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub fn get_file_location(&self, config: &FileLocationConfig, filename: &str) -> String {
        self.location.locate(config, &self.bucket_prefix, filename)
    }
}

/// `uploaded / total * 100` with two decimals, `None` for an empty upload.
fn progress_percentage(uploaded: u64, total: u64) -> Option<String> {
    if total == 0 {
        return None;
    }
    Some(format!("{:.2}", uploaded as f64 / total as f64 * 100.0))
}

/// Delivers the outcome of an upload session at most once.
struct Settlement(Mutex<Option<oneshot::Sender<Result<()>>>>);

impl Settlement {
    fn settle(&self, result: Result<()>) {
        let sender = self.0.lock().ok().and_then(|mut slot| slot.take());
        if let Some(sender) = sender {
            let _ = sender.send(result);
        }
    }
}

#[async_trait::async_trait]
impl FilesAdapter for StorageProxyAdapter {
    async fn create_file(&self, filename: &str, data: Bytes, content_type: &str) -> Result<()> {
        StorageProxyAdapter::create_file(self, filename, data, content_type).await
    }

    async fn delete_file(&self, filename: &str) -> Result<String> {
        StorageProxyAdapter::delete_file(self, filename).await
    }

    async fn get_file_data(&self, filename: &str) -> Result<Vec<u8>> {
        StorageProxyAdapter::get_file_data(self, filename).await
    }

    fn get_file_location(&self, config: &FileLocationConfig, filename: &str) -> String {
        StorageProxyAdapter::get_file_location(self, config, filename)
    }
}
