// S3 client backed by rust-s3

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::Bucket;
use std::time::Duration;
use tracing::debug;

use super::{ObjectStore, PutObject, StoreError, StoredObject};
use crate::config::StorageConfig;

pub struct S3ObjectStore {
    bucket: Box<Bucket>,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("bucket", &self.bucket.name())
            .finish_non_exhaustive()
    }
}

impl S3ObjectStore {
    /// Custom endpoints use path-style addressing; plain AWS uses the
    /// virtual-hosted bucket host.
    pub fn new(config: &StorageConfig) -> Result<Self, StoreError> {
        let bucket_name = config
            .bucket
            .as_deref()
            .ok_or_else(|| StoreError::Internal("bucket name required".into()))?;
        let region_name = config
            .region
            .clone()
            .ok_or_else(|| StoreError::Internal("region required".into()))?;

        let region = match config.endpoint.as_deref() {
            Some(endpoint) => Region::Custom {
                region: region_name,
                endpoint: endpoint.trim_end_matches('/').to_string(),
            },
            None => Region::Custom {
                endpoint: format!("https://s3.{region_name}.amazonaws.com"),
                region: region_name,
            },
        };

        let credentials = Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StoreError::Internal(format!("credentials: {e}")))?;

        let mut bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StoreError::Internal(format!("bucket: {e}")))?;
        if config.endpoint.is_some() {
            bucket.set_path_style();
        }

        Ok(Self { bucket })
    }
}

fn map_s3_error(e: S3Error) -> StoreError {
    StoreError::Internal(format!("s3: {e}"))
}

fn header<'a>(headers: &'a std::collections::HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, object: PutObject) -> Result<(), StoreError> {
        let mut bucket = self.bucket.clone();
        if let Some(disposition) = &object.content_disposition {
            bucket.add_header("Content-Disposition", disposition);
        }

        let response = bucket
            .put_object_with_content_type(key, &object.body, &object.content_type)
            .await
            .map_err(map_s3_error)?;
        if response.status_code() >= 300 {
            return Err(StoreError::Internal(format!(
                "s3 put {}: status {}",
                key,
                response.status_code()
            )));
        }

        debug!(key, size = object.body.len(), "Stored object");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<StoredObject, StoreError> {
        let response = self.bucket.get_object(key).await.map_err(map_s3_error)?;
        if response.status_code() == 404 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if response.status_code() >= 400 {
            return Err(StoreError::Internal(format!(
                "s3 get {}: status {}",
                key,
                response.status_code()
            )));
        }

        let headers = response.headers();
        let content_type = header(&headers, "content-type")
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let content_length = header(&headers, "content-length").and_then(|v| v.parse().ok());

        Ok(StoredObject {
            body: Bytes::from(response.to_vec()),
            content_type,
            content_length,
        })
    }

    async fn sign_url(&self, key: &str, expires_in: Duration) -> Result<String, StoreError> {
        let expiry_secs = u32::try_from(expires_in.as_secs())
            .map_err(|_| StoreError::Internal(format!("expiry too long: {expires_in:?}")))?;
        self.bucket
            .presign_get(key, expiry_secs, None)
            .await
            .map_err(map_s3_error)
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        let response = self.bucket.delete_object(key).await.map_err(map_s3_error)?;
        let status = response.status_code();
        // 404: already absent
        if status >= 300 && status != 404 {
            return Err(StoreError::Internal(format!(
                "s3 delete {}: status {}",
                key, status
            )));
        }

        debug!(key, "Deleted object");
        Ok(())
    }
}
