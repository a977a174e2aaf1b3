use crate::config::options::AdapterOptions;
use crate::domain::model::FileLocationConfig;
use crate::utils::error::{AdapterError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_s3_bucket_name, validate_url,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub adapter: AdapterOptions,
    pub files: Option<FileLocationConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl TomlConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AdapterError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AdapterError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` placeholders. Undefined variables are left verbatim.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AdapterError::ConfigError {
            message: format!("invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn location_config(&self) -> Option<&FileLocationConfig> {
        self.files.as_ref()
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        let adapter = &self.adapter;

        validate_url("adapter.proxyUrl", &adapter.proxy_url)?;
        validate_non_empty_string("adapter.appId", &adapter.app_id)?;
        validate_non_empty_string("adapter.masterKey", &adapter.master_key)?;

        if let Some(chunk_size) = adapter.chunk_size {
            validate_positive_number("adapter.chunkSize", chunk_size, 1)?;
        }

        if adapter.direct_access {
            match adapter.base_url.as_deref().filter(|url| !url.is_empty()) {
                Some(base_url) => validate_url("adapter.baseUrl", base_url)?,
                None => validate_s3_bucket_name("adapter.bucket", &adapter.bucket)?,
            }
        }

        if let Some(files) = &self.files {
            validate_non_empty_string("files.mount", &files.mount)?;
            validate_non_empty_string("files.applicationId", &files.application_id)?;
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[adapter]
appId = "appId"
masterKey = "masterKey"
proxyUrl = "https://proxy.example.com"
bucket = "my-bucket"
bucketPrefix = "prefix_"
retryDelays = [0, 20, 50]
chunkSize = 1048576

[files]
mount = "https://api.example.com/1"
applicationId = "appId"

[logging]
level = "debug"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.adapter.app_id, "appId");
        assert_eq!(config.adapter.bucket_prefix.as_deref(), Some("prefix_"));
        assert_eq!(config.adapter.retry_delays, Some(vec![0, 20, 50]));
        assert_eq!(config.adapter.chunk_size, Some(1048576));
        assert!(!config.adapter.direct_access);
        assert_eq!(config.location_config().unwrap().mount, "https://api.example.com/1");
        assert_eq!(config.log_level(), Some("debug"));
        assert!(!config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_retry_delays_fall_back_to_default() {
        let toml_content = r#"
[adapter]
appId = "appId"
masterKey = "masterKey"
proxyUrl = "https://proxy.example.com"
retryDelays = ["soon", 10]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.adapter.retry_delays, None);
    }

    #[test]
    fn test_invalid_chunk_size_falls_back_to_default() {
        let toml_content = r#"
[adapter]
appId = "appId"
masterKey = "masterKey"
proxyUrl = "https://proxy.example.com"
chunkSize = -1
"#;
        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.adapter.chunk_size, None);

        let quoted = toml_content.replace("chunkSize = -1", "chunkSize = \"4096\"");
        let config = TomlConfig::from_toml_str(&quoted).unwrap();
        assert_eq!(config.adapter.chunk_size, Some(4096));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SASHIDO_TEST_MASTER_KEY", "from-env");

        let toml_content = r#"
[adapter]
appId = "appId"
masterKey = "${SASHIDO_TEST_MASTER_KEY}"
proxyUrl = "https://proxy.example.com"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.adapter.master_key, "from-env");

        std::env::remove_var("SASHIDO_TEST_MASTER_KEY");
    }

    #[test]
    fn test_unknown_env_var_is_kept() {
        let toml_content = r#"
[adapter]
appId = "${SASHIDO_TEST_UNDEFINED_VARIABLE}"
masterKey = "masterKey"
proxyUrl = "https://proxy.example.com"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.adapter.app_id, "${SASHIDO_TEST_UNDEFINED_VARIABLE}");
    }

    #[test]
    fn test_config_validation() {
        let invalid_proxy = r#"
[adapter]
appId = "appId"
masterKey = "masterKey"
proxyUrl = "invalid-url"
"#;
        let config = TomlConfig::from_toml_str(invalid_proxy).unwrap();
        assert!(config.validate().is_err());

        let missing_bucket = r#"
[adapter]
appId = "appId"
masterKey = "masterKey"
proxyUrl = "https://proxy.example.com"
directAccess = true
"#;
        let config = TomlConfig::from_toml_str(missing_bucket).unwrap();
        assert!(config.validate().is_err());

        let direct_base_url = r#"
[adapter]
appId = "appId"
masterKey = "masterKey"
proxyUrl = "https://proxy.example.com"
directAccess = true
baseUrl = "https://cdn.example.com"
"#;
        let config = TomlConfig::from_toml_str(direct_base_url).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_adapter_section_is_rejected() {
        let result = TomlConfig::from_toml_str("[logging]\nlevel = \"info\"\n");
        assert!(matches!(
            result,
            Err(AdapterError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.adapter.bucket, "my-bucket");
    }
}
