use crate::ids::JobId;
use serde::{Deserialize, Serialize};

/// Connection parameters for either the source or the destination engine.
/// Credential loading itself is out of scope (an external collaborator);
/// `secret` is whatever the caller already resolved (env var, vault, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub engine: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub secret: String,
    pub database: String,
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStoreConfig {
    pub bucket: String,
    pub key_prefix: String,
    pub access_id: String,
    pub secret: String,
    pub region: String,
}

fn default_batch_size() -> usize {
    5_000_000
}

/// Immutable job description, created by the caller and held fixed for
/// the job's whole lifetime (§3 Lifecycle).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub job_id: JobId,
    pub source: ConnectionConfig,
    pub destination: ConnectionConfig,
    pub blob_store: BlobStoreConfig,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl JobSpec {
    pub fn new(
        source: ConnectionConfig,
        destination: ConnectionConfig,
        blob_store: BlobStoreConfig,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            source,
            destination,
            blob_store,
            batch_size: default_batch_size(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// `{bucket}/{key_prefix}/{job_id}/*.parquet`, the glob the
    /// destination ingest directive is bound to.
    pub fn blob_glob(&self) -> String {
        format!(
            "{}/{}/{}/*.parquet",
            self.blob_store.bucket, self.blob_store.key_prefix, self.job_id
        )
    }

    /// `{key_prefix}/{job_id}/{table}_{batch_index}.parquet`
    pub fn blob_key(&self, batch_index: crate::ids::BatchIndex) -> String {
        format!(
            "{}/{}/{}_{}.parquet",
            self.blob_store.key_prefix, self.job_id, self.source.table, batch_index
        )
    }

    /// `exports/{job_id}/{table}_{batch_index}.parquet`
    pub fn local_path(&self, batch_index: crate::ids::BatchIndex) -> std::path::PathBuf {
        std::path::PathBuf::from("exports")
            .join(self.job_id.as_str())
            .join(format!("{}_{}.parquet", self.source.table, batch_index))
    }

    pub fn local_dir(&self) -> std::path::PathBuf {
        std::path::PathBuf::from("exports").join(self.job_id.as_str())
    }
}
