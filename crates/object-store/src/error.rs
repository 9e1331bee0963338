use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read local file {path}: {source}")]
    ReadLocal {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build blob-store client for bucket {bucket}: {source}")]
    ClientSetup {
        bucket: String,
        #[source]
        source: object_store::Error,
    },

    #[error("upload of key {key} failed: {source}")]
    Put {
        key: String,
        #[source]
        source: object_store::Error,
    },
}

impl UploadError {
    /// Transient failures (throttling, 5xx) are retriable under §4.6's
    /// backoff policy; a malformed bucket/key or local read failure is not.
    pub fn is_transient(&self) -> bool {
        match self {
            UploadError::Put { source, .. } => matches!(
                source,
                object_store::Error::Generic { .. } | object_store::Error::NotImplemented
            ),
            UploadError::ReadLocal { .. } | UploadError::ClientSetup { .. } => false,
        }
    }
}
