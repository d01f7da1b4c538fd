// Storage layer (S3-compatible)

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

pub mod keys;
pub mod s3_client;

pub use keys::{build_key, parse_key, ObjectUrls, UPLOAD_PREFIX};
pub use s3_client::S3ObjectStore;

/// Lifetime of signed read URLs handed to external services.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Internal(String),
}

/// An object read back from the store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

/// Write parameters for a single object.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub body: Bytes,
    pub content_type: String,
    pub content_disposition: Option<String>,
}

/// Capability interface over the object store; one configured client is built
/// at start-up and shared by every request.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, key: &str, object: PutObject) -> Result<(), StoreError>;

    /// Returns `StoreError::NotFound` if the key is absent.
    async fn get_object(&self, key: &str) -> Result<StoredObject, StoreError>;

    /// Produce a credential-free GET URL for `key` valid for `expires_in`.
    async fn sign_url(&self, key: &str, expires_in: Duration) -> Result<String, StoreError>;

    /// Delete an object. No-op if absent.
    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;
}

/// `Content-Disposition` value for a download of `filename`.
pub fn attachment_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"",
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_percent_encodes_filename() {
        assert_eq!(
            attachment_disposition("receipt.png"),
            "attachment; filename=\"receipt.png\""
        );
        assert_eq!(
            attachment_disposition("café \"lunch\".jpg"),
            "attachment; filename=\"caf%C3%A9%20%22lunch%22.jpg\""
        );
    }
}
