use connectors::{ConnectError, IngestError, QueryError, SchemaError};
use engine_config::SchemaMismatch;
use model::BatchIndex;
use thiserror::Error;

/// Top-level error for a job run, surfaced once in `JobOutcome` on any
/// terminal Failed path (§7). Wraps every fatal kind named across the
/// connector/writer/object-store/config crates plus the Coordinator's own
/// cross-component checks (schema gate, row-count conservation, batch
/// failure, cancellation).
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("{component} failed its health check (SELECT 1)")]
    Unresponsive { component: &'static str },

    #[error("{failed} of {total} batches failed; destination ingest was not issued")]
    BatchesFailed { failed: usize, total: usize },

    #[error("row count mismatch on {table}: expected {expected}, found {found}")]
    RowCountMismatch { table: String, expected: usize, found: usize },

    #[error("job cancelled")]
    Cancelled,
}

/// A single batch's failure reason, recorded on its `BatchResult` and
/// folded into the job-level `BatchesFailed` once execution completes.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Write(#[from] columnar::WriteError),

    #[error(transparent)]
    Upload(#[from] object_store_client::UploadError),

    #[error("cancelled before batch {0} completed")]
    Cancelled(BatchIndex),
}
