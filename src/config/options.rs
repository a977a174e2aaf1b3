use serde::{Deserialize, Deserializer, Serialize};

/// Version segment appended to every proxy URL.
pub const API_VERSION: &str = "2";

pub const DEFAULT_RETRY_DELAYS: [u64; 4] = [0, 1000, 3000, 5000];

/// 5 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Options accepted when constructing a
/// [`StorageProxyAdapter`](crate::core::adapter::StorageProxyAdapter).
///
/// Nothing here is validated at construction time. Malformed retry delays or
/// chunk sizes fall back to their defaults; use
/// [`Validate`](crate::utils::validation::Validate) on a loaded config file for
/// strict checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterOptions {
    pub app_id: String,
    pub master_key: String,
    pub proxy_url: String,
    #[serde(default)]
    pub direct_access: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Use `base_url` as-is, without the bucket prefix.
    #[serde(default)]
    pub base_url_direct: bool,
    #[serde(default)]
    pub use_accelerate_endpoint: bool,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub bucket_prefix: Option<String>,
    #[serde(default, deserialize_with = "deserialize_retry_delays")]
    pub retry_delays: Option<Vec<u64>>,
    #[serde(default, deserialize_with = "deserialize_chunk_size")]
    pub chunk_size: Option<usize>,
}

/// Appends the trailing separator and the API version segment.
pub fn normalize_proxy_url(proxy_url: &str) -> String {
    let mut url = proxy_url.to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(API_VERSION);
    url.push('/');
    url
}

pub fn normalize_retry_delays(retry_delays: Option<&[u64]>) -> Vec<u64> {
    match retry_delays {
        Some(delays) if !delays.is_empty() => delays.to_vec(),
        _ => DEFAULT_RETRY_DELAYS.to_vec(),
    }
}

pub fn normalize_chunk_size(chunk_size: Option<usize>) -> usize {
    match chunk_size {
        Some(size) if size > 0 => size,
        _ => DEFAULT_CHUNK_SIZE,
    }
}

/// Coerces a loosely typed delay schedule into milliseconds.
///
/// Returns `None` unless `value` is a non-empty array whose every element is
/// integer-parseable.
pub fn parse_retry_delays(value: &serde_json::Value) -> Option<Vec<u64>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    items.iter().map(parse_non_negative_integer).collect()
}

/// Coerces a loosely typed chunk size. `None` unless it is a positive integer.
pub fn parse_chunk_size(value: &serde_json::Value) -> Option<usize> {
    parse_non_negative_integer(value)
        .filter(|size| *size > 0)
        .and_then(|size| usize::try_from(size).ok())
}

fn parse_non_negative_integer(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.trunc() as u64)
        }),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn deserialize_retry_delays<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<u64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_retry_delays(&value))
}

fn deserialize_chunk_size<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_chunk_size(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_proxy_url_gets_version_segment() {
        assert_eq!(normalize_proxy_url("http://proxy-url.com"), "http://proxy-url.com/2/");
        assert_eq!(normalize_proxy_url("http://proxy-url.com/"), "http://proxy-url.com/2/");
        assert_eq!(normalize_proxy_url("http://proxy/api"), "http://proxy/api/2/");
    }

    #[test]
    fn test_retry_delays_fallback() {
        assert_eq!(normalize_retry_delays(None), DEFAULT_RETRY_DELAYS.to_vec());
        assert_eq!(normalize_retry_delays(Some(&[])), DEFAULT_RETRY_DELAYS.to_vec());
        assert_eq!(normalize_retry_delays(Some(&[0, 20, 50])), vec![0, 20, 50]);
    }

    #[test]
    fn test_parse_retry_delays_coerces_elements() {
        assert_eq!(parse_retry_delays(&json!([0, "20", 50.7])), Some(vec![0, 20, 50]));
        assert_eq!(parse_retry_delays(&json!([" 100 "])), Some(vec![100]));
    }

    #[test]
    fn test_parse_retry_delays_rejects_invalid() {
        assert_eq!(parse_retry_delays(&json!([])), None);
        assert_eq!(parse_retry_delays(&json!("0,1000")), None);
        assert_eq!(parse_retry_delays(&json!([0, "soon"])), None);
        assert_eq!(parse_retry_delays(&json!([-5])), None);
        assert_eq!(parse_retry_delays(&json!(null)), None);
    }

    #[test]
    fn test_chunk_size_fallback() {
        assert_eq!(normalize_chunk_size(None), DEFAULT_CHUNK_SIZE);
        assert_eq!(normalize_chunk_size(Some(0)), DEFAULT_CHUNK_SIZE);
        assert_eq!(normalize_chunk_size(Some(1024)), 1024);
    }

    #[test]
    fn test_parse_chunk_size() {
        assert_eq!(parse_chunk_size(&json!(1024)), Some(1024));
        assert_eq!(parse_chunk_size(&json!("5")), Some(5));
        assert_eq!(parse_chunk_size(&json!(0)), None);
        assert_eq!(parse_chunk_size(&json!(-1)), None);
        assert_eq!(parse_chunk_size(&json!("large")), None);
        assert_eq!(parse_chunk_size(&json!([1024])), None);
    }

    #[test]
    fn test_deserialize_lenient_options() {
        let options: AdapterOptions = serde_json::from_value(json!({
            "appId": "appId",
            "masterKey": "masterKey",
            "proxyUrl": "http://proxy-url.com",
            "bucket": "bucket",
            "retryDelays": "not a list",
            "chunkSize": -1
        }))
        .unwrap();

        assert_eq!(options.app_id, "appId");
        assert!(!options.direct_access);
        assert_eq!(options.retry_delays, None);
        assert_eq!(options.chunk_size, None);
        assert_eq!(options.bucket_prefix, None);

        let options: AdapterOptions = serde_json::from_value(json!({
            "appId": "a",
            "masterKey": "m",
            "proxyUrl": "http://proxy",
            "retryDelays": ["0", 20]
        }))
        .unwrap();
        assert_eq!(options.retry_delays, Some(vec![0, 20]));
    }
}
