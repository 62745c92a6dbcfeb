//! S3 access: object existence checks, JSON read/write, presigned URLs and
//! a read-through JSON cache.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use serde_json::Value;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use crate::errors::SpaceCatError;

/// Attempts made by [`S3ObjectStore::head_object`] before giving up.
pub const HEAD_RETRY_ATTEMPTS: usize = 3;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// `Ok(false)` when the object does not exist.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool, SpaceCatError>;

    /// `Ok(None)` when the object does not exist.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, SpaceCatError>;

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>)
    -> Result<(), SpaceCatError>;

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, SpaceCatError>;
}

/// # Errors
///
/// Returns an error if the object cannot be read or is not valid JSON.
pub async fn get_json(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<Option<Value>, SpaceCatError> {
    match store.get_object(bucket, key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(|e| {
            SpaceCatError::ParseError(format!("s3://{bucket}/{key} is not valid JSON: {e}"))
        })?)),
        None => Ok(None),
    }
}

/// # Errors
///
/// Returns an error if the object cannot be written.
pub async fn put_json(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    value: &Value,
) -> Result<(), SpaceCatError> {
    let body = serde_json::to_vec(value)?;
    store.put_object(bucket, key, body).await
}

/// Key of the cached scrape result for a page of a site.
///
/// `path` is the URL path of the page; `/` and `` both address the home page.
#[must_use]
pub fn scrape_result_key(site_id: &str, path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    let path = if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    format!("scrapes/{site_id}{path}/scrape.json")
}

/// Read-through JSON cache on top of an [`ObjectStore`] bucket.
pub struct S3JsonCache {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl S3JsonCache {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Returns the object cached at `key`; otherwise runs `compute`, writes its
    /// result to `key` and returns it.
    ///
    /// A failed cache write is logged and does not fail the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lookup or `compute` fails.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<Value, SpaceCatError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Value, SpaceCatError>> + Send,
    {
        if self.store.head_object(&self.bucket, key).await? {
            if let Some(cached) = get_json(self.store.as_ref(), &self.bucket, key).await? {
                debug!(key = %key, "Cache hit");
                return Ok(cached);
            }
        }

        info!(key = %key, "Cache miss, computing");
        let value = compute().await?;
        if let Err(e) = put_json(self.store.as_ref(), &self.bucket, key, &value).await {
            warn!(key = %key, error = %e, "Failed to write cache entry");
        }
        Ok(value)
    }
}

pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    #[must_use]
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    pub async fn from_env() -> Self {
        let shared_config = aws_config::from_env().load().await;
        Self::new(S3Client::new(&shared_config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool, SpaceCatError> {
        let strategy = ExponentialBackoff::from_millis(100)
            .map(jitter)
            .take(HEAD_RETRY_ATTEMPTS - 1);

        Retry::start(strategy, || async {
            match self.client.head_object().bucket(bucket).key(key).send().await {
                Ok(_) => Ok(true),
                Err(e) => {
                    let service_error = e.into_service_error();
                    if service_error.is_not_found() {
                        Ok(false)
                    } else {
                        warn!(bucket = %bucket, key = %key, "HEAD failed, retrying");
                        Err(SpaceCatError::AwsError(format!(
                            "HEAD s3://{bucket}/{key}: {service_error}"
                        )))
                    }
                }
            }
        })
        .await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, SpaceCatError> {
        let resp = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(SpaceCatError::AwsError(format!(
                    "GET s3://{bucket}/{key}: {service_error}"
                )));
            }
        };

        let bytes = resp
            .body
            .collect()
            .await
            .map_err(|e| SpaceCatError::AwsError(format!("Reading s3://{bucket}/{key}: {e}")))?
            .into_bytes();
        Ok(Some(bytes.to_vec()))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), SpaceCatError> {
        let content_type = mime_guess::from_path(key).first_or_octet_stream();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type.essence_str())
            .body(ByteStream::from(body))
            .send()
            .await?;
        debug!(bucket = %bucket, key = %key, "Object written");
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, SpaceCatError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| SpaceCatError::AwsError(format!("Invalid presign expiry: {e}")))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await?;
        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::scrape_result_key;

    #[test]
    fn scrape_keys_normalize_slashes() {
        assert_eq!(scrape_result_key("s1", "/"), "scrapes/s1/scrape.json");
        assert_eq!(scrape_result_key("s1", ""), "scrapes/s1/scrape.json");
        assert_eq!(
            scrape_result_key("s1", "/products/shoes/"),
            "scrapes/s1/products/shoes/scrape.json"
        );
        assert_eq!(
            scrape_result_key("s1", "blog"),
            "scrapes/s1/blog/scrape.json"
        );
    }
}
