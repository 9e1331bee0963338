use crate::error::UploadError;
use bytes::Bytes;
use model::BlobStoreConfig;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::Path as FsPath;
use std::sync::Arc;
use tracing::info;

/// Uploads local files to a job-scoped prefix in blob storage. Wraps
/// `Arc<dyn ObjectStore>` so tests can substitute an in-memory or
/// failure-injecting store without touching the upload call sites.
#[derive(Clone)]
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String) -> Self {
        Self { store, bucket }
    }

    pub fn from_config(config: &BlobStoreConfig) -> Result<Self, UploadError> {
        let store = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_access_key_id(&config.access_id)
            .with_secret_access_key(&config.secret)
            .build()
            .map_err(|source| UploadError::ClientSetup { bucket: config.bucket.clone(), source })?;

        Ok(Self::new(Arc::new(store), config.bucket.clone()))
    }

    /// Uploads `local_path` to `key`. `object_store::put` issues a single
    /// request (or a multipart upload that only commits on completion),
    /// which is what gives the §4.4 atomic-visibility contract: readers
    /// never observe a partially-written object under `key`.
    pub async fn upload(&self, local_path: &FsPath, key: &str) -> Result<(), UploadError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|source| UploadError::ReadLocal { path: local_path.to_path_buf(), source })?;

        let path = ObjectPath::from(key);
        info!(bucket = %self.bucket, %key, bytes = bytes.len(), "uploading blob");

        self.store
            .put(&path, PutPayload::from(Bytes::from(bytes)))
            .await
            .map_err(|source| UploadError::Put { key: key.to_string(), source })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[tokio::test]
    async fn uploads_a_readable_object() {
        let store = Arc::new(InMemory::new());
        let client = ObjectStoreClient::new(store.clone(), "bkt".to_string());

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("batch_0.parquet");
        tokio::fs::write(&local, b"parquet-bytes").await.unwrap();

        client.upload(&local, "prefix/job-1/t_0.parquet").await.unwrap();

        let path = ObjectPath::from("prefix/job-1/t_0.parquet");
        let result = store.get(&path).await.unwrap();
        let bytes = result.bytes().await.unwrap();
        assert_eq!(&bytes[..], b"parquet-bytes");
    }

    #[tokio::test]
    async fn upload_of_missing_local_file_is_not_transient() {
        let store = Arc::new(InMemory::new());
        let client = ObjectStoreClient::new(store, "bkt".to_string());
        let err = client.upload(FsPath::new("/does/not/exist"), "k").await.unwrap_err();
        assert!(!err.is_transient());
    }
}
