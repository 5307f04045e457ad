//! Object source abstraction for bucket listing and object retrieval
//!
//! This module defines the `ObjectSource` trait that abstracts where object keys
//! and bodies come from, so the ingestion pass never talks to a storage client
//! directly.
//!
//! `ObjectStoreSource` implements it on top of the `object_store` crate, mapping
//! bucket names to stores:
//! - local directories (`LocalFileSystem`)
//! - in-memory stores (`InMemory`), mostly for tests and dry runs
//! - Amazon S3 (`AmazonS3`, behind the `aws` feature)

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::ObjectStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Trait for listing bucket contents and reading object bodies
///
/// # Example
/// ```ignore
/// use bucket_catalog::source::ObjectSource;
///
/// async fn show(source: &dyn ObjectSource) {
///     for key in source.list_objects("landing").await.unwrap() {
///         println!("{}", key);
///     }
/// }
/// ```
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// List every object key in a bucket
    ///
    /// Pagination is exhausted before returning; the result is the complete listing.
    ///
    /// # Errors
    /// Returns error if the bucket is unknown or the listing call fails
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>>;

    /// Read the full body of an object
    ///
    /// # Returns
    /// `None` when the object does not exist
    async fn get_object_body(&self, bucket: &str, key: &str) -> Result<Option<Bytes>>;
}

/// `ObjectSource` backed by `object_store` implementations
#[derive(Debug, Clone, Default)]
pub struct ObjectStoreSource {
    buckets: HashMap<String, Arc<dyn ObjectStore>>,
}

impl ObjectStoreSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bucket` from an existing store
    pub fn with_bucket(mut self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.buckets.insert(bucket.into(), store);
        self
    }

    /// Serve `bucket` from a local directory
    ///
    /// # Errors
    /// Returns error if `root` does not exist or cannot be canonicalised
    pub fn local(bucket: impl Into<String>, root: impl AsRef<std::path::Path>) -> Result<Self> {
        let store = LocalFileSystem::new_with_prefix(root)?;
        Ok(Self::new().with_bucket(bucket, Arc::new(store)))
    }

    /// Serve `bucket` from Amazon S3 (or an S3-compatible endpoint)
    ///
    /// Credentials and region are read from the standard `AWS_*` environment variables.
    #[cfg(feature = "aws")]
    pub fn s3(bucket: impl Into<String>, endpoint: Option<&str>) -> Result<Self> {
        use object_store::aws::AmazonS3Builder;

        let bucket = bucket.into();
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&bucket);
        if let Some(endpoint) = endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }
        let store = builder.build()?;
        Ok(Self::new().with_bucket(bucket, Arc::new(store)))
    }

    pub fn buckets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.buckets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn store(&self, bucket: &str) -> Result<&Arc<dyn ObjectStore>> {
        self.buckets
            .get(bucket)
            .ok_or_else(|| Error::Source(format!("Unknown bucket '{}'", bucket)))
    }
}

#[async_trait]
impl ObjectSource for ObjectStoreSource {
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>> {
        let store = self.store(bucket)?;
        let objects: Vec<_> = store.list(None).try_collect().await?;

        debug!(bucket = bucket, objects = objects.len(), "Listed bucket");

        Ok(objects
            .into_iter()
            .map(|meta| meta.location.to_string())
            .collect())
    }

    async fn get_object_body(&self, bucket: &str, key: &str) -> Result<Option<Bytes>> {
        let store = self.store(bucket)?;

        match store.get(&Path::from(key)).await {
            Ok(result) => Ok(Some(result.bytes().await?)),
            Err(object_store::Error::NotFound { .. }) => {
                debug!(bucket = bucket, key = key, "Object not found");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}
