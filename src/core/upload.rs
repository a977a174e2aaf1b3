//! Resumable chunked uploads over the tus 1.0.0 protocol.
//!
//! An [`Upload`] creates a resource at the configured endpoint, then streams
//! the payload to it in `chunk_size` pieces. Failed requests are retried on
//! the `retry_delays` schedule, resuming from the offset the server reports.

use crate::domain::model::UploadMetadata;
use crate::utils::error::{AdapterError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::{Client, StatusCode};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

pub const TUS_VERSION: &str = "1.0.0";

const UPLOAD_OFFSET: &str = "upload-offset";
const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;
pub type SuccessCallback = Arc<dyn Fn() + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(AdapterError) + Send + Sync>;

#[derive(Clone)]
pub struct UploadOptions {
    pub endpoint: String,
    pub retry_delays: Vec<u64>,
    pub chunk_size: usize,
    pub metadata: UploadMetadata,
    pub headers: BTreeMap<String, String>,
    pub on_progress: ProgressCallback,
    pub on_success: SuccessCallback,
    pub on_error: ErrorCallback,
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("endpoint", &self.endpoint)
            .field("retry_delays", &self.retry_delays)
            .field("chunk_size", &self.chunk_size)
            .field("metadata", &self.metadata)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Upload {
    pub file: Bytes,
    pub options: UploadOptions,
    client: Client,
}

impl Upload {
    pub fn new(client: Client, file: Bytes, options: UploadOptions) -> Self {
        Self {
            file,
            options,
            client,
        }
    }

    /// Runs the session in the background. Exactly one of `on_success` and
    /// `on_error` is invoked when it ends.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            match self.run().await {
                Ok(()) => (self.options.on_success)(),
                Err(err) => (self.options.on_error)(err),
            }
        })
    }

    async fn run(&self) -> Result<()> {
        let mut upload_url: Option<Url> = None;
        let mut offset = 0u64;
        let mut attempt = 0usize;
        let mut offset_before_retry = 0u64;

        loop {
            let err = match self.transfer(&mut upload_url, &mut offset).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if offset > offset_before_retry {
                attempt = 0;
            }
            let delay = match self.options.retry_delays.get(attempt) {
                Some(delay) if err.is_retryable() => *delay,
                _ => return Err(err),
            };
            attempt += 1;
            offset_before_retry = offset;

            tracing::warn!(
                "Upload of '{}' failed at offset {} ({}), retry {} in {}ms",
                self.options.metadata.filename,
                offset,
                err,
                attempt,
                delay
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    async fn transfer(&self, upload_url: &mut Option<Url>, offset: &mut u64) -> Result<()> {
        let total = self.file.len() as u64;

        let url = match upload_url.clone() {
            Some(url) => match self.resume_offset(&url).await? {
                Some(server_offset) if server_offset > total => {
                    return Err(AdapterError::UploadError {
                        message: format!(
                            "server reported offset {} for an upload of {} bytes",
                            server_offset, total
                        ),
                    });
                }
                Some(server_offset) => {
                    *offset = server_offset;
                    url
                }
                None => {
                    *upload_url = None;
                    *offset = 0;
                    self.create().await?
                }
            },
            None => {
                *offset = 0;
                self.create().await?
            }
        };
        *upload_url = Some(url.clone());

        while *offset < total {
            let end = (*offset + self.options.chunk_size as u64).min(total);
            let chunk = self.file.slice(*offset as usize..end as usize);
            let next = self.patch(&url, *offset, chunk).await?;
            if next <= *offset || next > total {
                return Err(AdapterError::UploadError {
                    message: format!(
                        "server reported offset {} after receiving bytes {}..{}",
                        next, offset, end
                    ),
                });
            }
            *offset = next;
            (self.options.on_progress)(*offset, total);
        }

        Ok(())
    }

    fn base_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.options.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                AdapterError::UploadError {
                    message: format!("invalid header name '{}': {}", name, e),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| AdapterError::UploadError {
                message: format!("invalid value for header '{}': {}", name, e),
            })?;
            headers.insert(name, value);
        }
        headers.insert("tus-resumable", HeaderValue::from_static(TUS_VERSION));
        Ok(headers)
    }

    async fn create(&self) -> Result<Url> {
        tracing::debug!(
            "Creating upload for '{}' ({} bytes) at {}",
            self.options.metadata.filename,
            self.file.len(),
            self.options.endpoint
        );

        let response = self
            .client
            .post(&self.options.endpoint)
            .headers(self.base_headers()?)
            .header("upload-length", self.file.len())
            .header("upload-metadata", encode_metadata(&self.options.metadata))
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(AdapterError::from_status(response.status()));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AdapterError::UploadError {
                message: "upload creation response has no Location header".to_string(),
            })?;

        Ok(Url::parse(&self.options.endpoint)?.join(location)?)
    }

    /// Asks the server how much of the upload it already holds. `None` means
    /// the upload is unusable and must be created again. That is any client
    /// error except 423, which only means the upload is locked for now.
    async fn resume_offset(&self, url: &Url) -> Result<Option<u64>> {
        let response = self
            .client
            .head(url.clone())
            .headers(self.base_headers()?)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => read_offset(response.headers()).map(Some),
            StatusCode::LOCKED => Err(AdapterError::from_status(StatusCode::LOCKED)),
            status if status.is_client_error() => {
                tracing::debug!("Upload {} answered {}, creating a new one", url, status);
                Ok(None)
            }
            status => Err(AdapterError::from_status(status)),
        }
    }

    async fn patch(&self, url: &Url, offset: u64, chunk: Bytes) -> Result<u64> {
        let response = self
            .client
            .patch(url.clone())
            .headers(self.base_headers()?)
            .header("upload-offset", offset)
            .header(CONTENT_TYPE, OFFSET_CONTENT_TYPE)
            .body(chunk)
            .send()
            .await?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(AdapterError::from_status(response.status()));
        }

        read_offset(response.headers())
    }
}

fn read_offset(headers: &HeaderMap) -> Result<u64> {
    headers
        .get(UPLOAD_OFFSET)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| AdapterError::UploadError {
            message: "response has no valid Upload-Offset header".to_string(),
        })
}

/// `Upload-Metadata` value: `key base64(value)` pairs separated by commas.
pub fn encode_metadata(metadata: &UploadMetadata) -> String {
    metadata
        .pairs()
        .iter()
        .map(|(key, value)| format!("{} {}", key, STANDARD.encode(value)))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metadata() {
        let metadata = UploadMetadata {
            filename: "bucket_prefixtest.jpg".to_string(),
            filetype: "jpeg".to_string(),
        };
        assert_eq!(
            encode_metadata(&metadata),
            "filename YnVja2V0X3ByZWZpeHRlc3QuanBn,filetype anBlZw=="
        );
    }

    #[test]
    fn test_read_offset() {
        let mut headers = HeaderMap::new();
        assert!(read_offset(&headers).is_err());

        headers.insert("upload-offset", HeaderValue::from_static("1024"));
        assert_eq!(read_offset(&headers).unwrap(), 1024);

        headers.insert("upload-offset", HeaderValue::from_static("ten"));
        assert!(read_offset(&headers).is_err());
    }
}
