use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Unexpected response status: {status}")]
    HttpStatusError { code: u16, status: String },

    #[error("Upload failed: {message}")]
    UploadError { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

impl AdapterError {
    pub(crate) fn from_status(status: reqwest::StatusCode) -> Self {
        AdapterError::HttpStatusError {
            code: status.as_u16(),
            status: status.to_string(),
        }
    }

    /// Whether an upload session may retry after this error.
    ///
    /// Transport failures and server-side statuses are retried. Client errors
    /// are final except for 409 (offset mismatch) and 423 (locked).
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::RequestError(_) => true,
            AdapterError::HttpStatusError { code, .. } => {
                !(400..500).contains(code) || *code == 409 || *code == 423
            }
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AdapterError::RequestError(e) if e.is_timeout() => {
                "The file proxy did not answer in time".to_string()
            }
            AdapterError::RequestError(e) if e.is_connect() => {
                "Could not connect to the file proxy".to_string()
            }
            AdapterError::HttpStatusError { code: 401, .. }
            | AdapterError::HttpStatusError { code: 403, .. } => {
                "The file proxy rejected the application id or master key".to_string()
            }
            AdapterError::HttpStatusError { code: 404, .. } => {
                "The requested file does not exist".to_string()
            }
            AdapterError::ConfigError { .. }
            | AdapterError::ConfigValidationError { .. }
            | AdapterError::InvalidConfigValueError { .. } => {
                format!("Please check the configuration file: {}", self)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
