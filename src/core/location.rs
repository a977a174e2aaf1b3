//! Public URL construction for stored files.

use crate::config::options::AdapterOptions;
use crate::domain::model::FileLocationConfig;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left untouched by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub const MAX_DECODE_ITERATIONS: usize = 100;

pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Strict percent-decoding. `None` for a malformed escape or non UTF-8 output.
pub fn decode_uri_component(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape_ok = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(|b| b.is_ascii_hexdigit()));
            if !escape_ok {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Undoes any number of prior encodings, up to [`MAX_DECODE_ITERATIONS`].
///
/// A decode failure means the name is already in its plain form.
pub fn normalize_filename(filename: &str) -> String {
    let mut current = filename.to_string();
    for _ in 0..MAX_DECODE_ITERATIONS {
        match decode_uri_component(&current) {
            Some(decoded) if decoded != current => current = decoded,
            _ => break,
        }
    }
    current
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationPolicy {
    /// `<mount>/files/<applicationId>/<name>`
    Proxied,
    /// `<base_url>/[prefix]<name>`
    DirectBaseUrl { base_url: String, apply_prefix: bool },
    /// `https://<bucket>.s3[-accelerate].amazonaws.com/<prefix><name>`
    Bucket { bucket: String, accelerate: bool },
}

impl LocationPolicy {
    pub fn from_options(options: &AdapterOptions) -> Self {
        if !options.direct_access {
            return LocationPolicy::Proxied;
        }

        match options.base_url.as_deref().filter(|url| !url.is_empty()) {
            Some(base_url) => LocationPolicy::DirectBaseUrl {
                base_url: base_url.to_string(),
                apply_prefix: !options.base_url_direct,
            },
            None => LocationPolicy::Bucket {
                bucket: options.bucket.clone(),
                accelerate: options.use_accelerate_endpoint,
            },
        }
    }

    pub fn locate(&self, config: &FileLocationConfig, bucket_prefix: &str, filename: &str) -> String {
        let encoded = encode_uri_component(&normalize_filename(filename));

        match self {
            LocationPolicy::DirectBaseUrl {
                base_url,
                apply_prefix: false,
            } => format!("{}/{}", base_url, encoded),
            LocationPolicy::DirectBaseUrl {
                base_url,
                apply_prefix: true,
            } => format!("{}/{}{}", base_url, bucket_prefix, encoded),
            LocationPolicy::Bucket { bucket, accelerate } => {
                let accelerate = if *accelerate { "-accelerate" } else { "" };
                format!(
                    "https://{}.s3{}.amazonaws.com/{}{}",
                    bucket, accelerate, bucket_prefix, encoded
                )
            }
            LocationPolicy::Proxied => format!(
                "{}/files/{}/{}",
                config.mount, config.application_id, encoded
            ),
        }
    }
}
