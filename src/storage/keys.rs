//! Object key codec and URL builder.
//!
//! Stored document URLs are derived from the object key once, at upload time,
//! and later reversed back into the key for retrieval and signing. Both sides
//! live here so they stay consistent:
//! - `build_key` / `parse_key`: key policy and its configuration-free inverse
//! - `ObjectUrls`: public URL construction for the configured bucket, and the
//!   configuration-aware inverse used by the handlers

use url::Url;

use crate::config::StorageConfig;

/// Prefix under which uploaded documents are stored.
pub const UPLOAD_PREFIX: &str = "uploads";

pub fn build_key(id: &str) -> String {
    format!("{UPLOAD_PREFIX}/{id}")
}

/// Recover the object key from a stored URL.
///
/// Endpoint-style URLs carry the bucket as their first path segment, which is
/// dropped; hostname-style URLs already have the key as their path. Strings
/// that are not absolute URLs are treated as raw paths.
pub fn parse_key(stored_url: &str, bucket: &str) -> String {
    if stored_url.is_empty() {
        return String::new();
    }

    let segments = url_segments(stored_url);
    match segments.split_first() {
        None => String::new(),
        Some((first, rest)) if !bucket.is_empty() && first == bucket => rest.join("/"),
        Some(_) => segments.join("/"),
    }
}

fn url_segments(value: &str) -> Vec<String> {
    let path = match Url::parse(value) {
        Ok(url) => url.path().to_string(),
        Err(_) => value.to_string(),
    };
    split_path(&path)
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds externally resolvable object URLs for one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUrls {
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl ObjectUrls {
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: endpoint
                .map(|e| e.trim_end_matches('/').to_string())
                .filter(|e| !e.is_empty()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.bucket(), config.region(), config.endpoint.clone())
    }

    /// Host of the virtual-hosted AWS URL for this bucket.
    fn virtual_host(&self) -> String {
        format!("{}.s3.{}.amazonaws.com", self.bucket, self.region)
    }

    pub fn build_url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint, self.bucket, key),
            None => format!("https://{}/{}", self.virtual_host(), key),
        }
    }

    /// Inverse of [`ObjectUrls::build_url`] for this configuration.
    ///
    /// Unlike [`parse_key`] this also removes any path prefix carried by the
    /// endpoint, and keeps a leading segment equal to the bucket name when
    /// the bucket is already encoded in the host.
    pub fn key_for_url(&self, stored_url: &str) -> String {
        let Ok(url) = Url::parse(stored_url) else {
            return parse_key(stored_url, &self.bucket);
        };

        if url.host_str() == Some(self.virtual_host().as_str()) {
            return split_path(url.path()).join("/");
        }

        let mut segments = split_path(url.path());
        if let Some(prefix) = self.endpoint_path_prefix(&url) {
            if segments.starts_with(&prefix) {
                segments.drain(..prefix.len());
            }
        }
        parse_key(&format!("/{}", segments.join("/")), &self.bucket)
    }

    /// Path segments of the configured endpoint, when `url` points at it.
    fn endpoint_path_prefix(&self, url: &Url) -> Option<Vec<String>> {
        let endpoint = Url::parse(self.endpoint.as_deref()?).ok()?;
        if endpoint.host_str() != url.host_str() {
            return None;
        }
        let prefix = split_path(endpoint.path());
        (!prefix.is_empty()).then_some(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint_urls() -> ObjectUrls {
        ObjectUrls::new("receipts", "garage", Some("http://127.0.0.1:3900/".into()))
    }

    fn aws_urls() -> ObjectUrls {
        ObjectUrls::new("receipts", "eu-west-1", None)
    }

    #[test]
    fn build_key_prefixes_uploads() {
        assert_eq!(build_key("abc-123"), "uploads/abc-123");
    }

    #[test]
    fn build_url_endpoint_style_strips_trailing_slashes() {
        let urls = ObjectUrls::new("receipts", "garage", Some("https://minio.local///".into()));
        assert_eq!(
            urls.build_url("uploads/abc"),
            "https://minio.local/receipts/uploads/abc"
        );
    }

    #[test]
    fn build_url_hostname_style() {
        assert_eq!(
            aws_urls().build_url("uploads/abc"),
            "https://receipts.s3.eu-west-1.amazonaws.com/uploads/abc"
        );
    }

    #[test]
    fn parse_key_inverts_build_url_for_both_styles() {
        for urls in [endpoint_urls(), aws_urls()] {
            for key in ["uploads/abc-123", "uploads/0f8e7c1a-0000-4000-8000-000000000000", "a/b/c"] {
                let url = urls.build_url(key);
                assert_eq!(parse_key(&url, "receipts"), key, "url: {url}");
                assert_eq!(urls.key_for_url(&url), key, "url: {url}");
            }
        }
    }

    #[test]
    fn parse_key_handles_empty_and_bare_inputs() {
        assert_eq!(parse_key("", "receipts"), "");
        assert_eq!(parse_key("https://host.example", "receipts"), "");
        assert_eq!(parse_key("https://host.example/", "receipts"), "");
        assert_eq!(parse_key("/", "receipts"), "");
        assert_eq!(parse_key("receipts", "receipts"), "");
    }

    #[test]
    fn parse_key_falls_back_to_raw_path() {
        assert_eq!(parse_key("receipts/uploads/x", "receipts"), "uploads/x");
        assert_eq!(parse_key("//uploads//x/", "receipts"), "uploads/x");
        assert_eq!(parse_key("not a url at all", "receipts"), "not a url at all");
        assert_eq!(parse_key("http://[::1", "receipts"), "http:/[::1");
    }

    #[test]
    fn parse_key_never_panics_on_odd_input() {
        let inputs = [
            "::::", "?", "#frag", "http://", "https:///x", "\u{0}", "日本/語", "%%%", " / / ",
            "mailto:someone@example.com", "file:///etc/passwd",
        ];
        for input in inputs {
            let _ = parse_key(input, "receipts");
            let _ = aws_urls().key_for_url(input);
            let _ = endpoint_urls().key_for_url(input);
        }
    }

    #[test]
    fn key_for_url_strips_endpoint_path_prefix() {
        let urls = ObjectUrls::new("receipts", "garage", Some("https://cdn.example/storage".into()));
        let url = urls.build_url("uploads/abc");
        assert_eq!(url, "https://cdn.example/storage/receipts/uploads/abc");
        assert_eq!(urls.key_for_url(&url), "uploads/abc");
    }

    #[test]
    fn key_for_url_keeps_bucket_named_segment_on_virtual_host() {
        let urls = ObjectUrls::new("uploads", "us-east-1", None);
        let url = urls.build_url("uploads/abc");
        assert_eq!(urls.key_for_url(&url), "uploads/abc");
    }

    #[test]
    fn key_for_url_accepts_relative_paths() {
        assert_eq!(endpoint_urls().key_for_url("/receipts/uploads/abc"), "uploads/abc");
    }
}
