use crate::error::BatchError;
use columnar::{ColumnarWriter, WriterConfig};
use connectors::SourceConnector;
use engine_core::{JobMetrics, RetryDisposition, RetryPolicy};
use model::{BatchIndex, BatchRange, BatchResult, BatchState, JobSpec, Schema};
use object_store_client::ObjectStoreClient;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Resources a Batch Worker needs that are shared across the whole job
/// rather than owned per-batch: the (already-connected) source, the blob
/// client, and the policies/counters every step reads from.
pub struct WorkerContext<S: SourceConnector> {
    pub source: Arc<S>,
    pub object_store: ObjectStoreClient,
    pub writer_config: WriterConfig,
    pub retry_policy: RetryPolicy,
    pub metrics: JobMetrics,
    pub cancel: CancellationToken,
}

const ENOSPC: i32 = 28;

/// Steps that touch I/O are retriable unless the failure is one the
/// backoff loop cannot fix: a malformed statement, a type mismatch baked
/// into the schema, or disk actually being full.
fn is_transient(err: &BatchError) -> bool {
    match err {
        BatchError::Query(e) => e.is_transient(),
        BatchError::Write(columnar::WriteError::Open { source, .. }) => {
            source.raw_os_error() != Some(ENOSPC)
        }
        BatchError::Write(_) => false,
        BatchError::Upload(e) => e.is_transient(),
        BatchError::Cancelled(_) => false,
    }
}

/// Races `fut` against the job's cancellation token so a worker parked on
/// a suspension point (network read, upload) aborts at the next poll
/// instead of running to completion after cancellation was requested.
async fn cancellable<Fut, T>(
    cancel: &CancellationToken,
    batch_index: BatchIndex,
    fut: Fut,
) -> Result<T, BatchError>
where
    Fut: Future<Output = Result<T, BatchError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BatchError::Cancelled(batch_index)),
        result = fut => result,
    }
}

async fn run_retriable<S, F, Fut, T>(
    ctx: &WorkerContext<S>,
    batch_index: BatchIndex,
    mut op: F,
) -> Result<(T, usize), BatchError>
where
    S: SourceConnector,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BatchError>>,
{
    ctx.retry_policy
        .run(
            || cancellable(&ctx.cancel, batch_index, op()),
            |err| if is_transient(err) { RetryDisposition::Retry } else { RetryDisposition::Stop },
        )
        .await
        .map_err(|e| e.into_inner())
}

/// Runs one batch's full pipeline (read → serialise → upload → release)
/// and returns its terminal `BatchResult`. Never panics: every fallible
/// step is caught and folded into `BatchState::Failed` so the caller can
/// join an arbitrary number of these without a `Result` wrapper.
pub async fn run_batch<S: SourceConnector + 'static>(
    ctx: Arc<WorkerContext<S>>,
    spec: Arc<JobSpec>,
    schema: Arc<Schema>,
    range: BatchRange,
) -> BatchResult {
    let mut result = BatchResult::pending(range.batch_index);
    let table = spec.source.table.clone();

    match run_batch_inner(&ctx, &spec, &schema, range, &table, &mut result).await {
        Ok(()) => {
            result.state = BatchState::Done;
            ctx.metrics.increment_batches_done();
        }
        Err(err) => {
            warn!(batch_index = %range.batch_index, %err, "batch failed");
            result.state = BatchState::Failed;
            result.error = Some(err.to_string());
            ctx.metrics.increment_batches_failed();
        }
    }

    result
}

async fn run_batch_inner<S: SourceConnector + 'static>(
    ctx: &Arc<WorkerContext<S>>,
    spec: &Arc<JobSpec>,
    schema: &Arc<Schema>,
    range: BatchRange,
    table: &str,
    result: &mut BatchResult,
) -> Result<(), BatchError> {
    let mut retries = 0usize;

    result.state = BatchState::Reading;
    let (rows, attempts) = run_retriable(ctx, range.batch_index, || {
        let source = ctx.source.clone();
        let table = table.to_string();
        async move { source.read_range(&table, range.offset, range.limit).await.map_err(BatchError::from) }
    })
    .await?;
    retries += attempts;
    result.rows_read = rows.len();
    ctx.metrics.add_rows_read(rows.len() as u64);

    result.state = BatchState::Writing;
    let local_path = spec.local_path(range.batch_index);
    let (_, attempts) = run_retriable(ctx, range.batch_index, || {
        let write_path = local_path.clone();
        let write_schema = schema.clone();
        let writer_config = ctx.writer_config.clone();
        let rows = rows.clone();
        async move {
            tokio::task::spawn_blocking(move || ColumnarWriter::write(&write_path, &write_schema, &rows, &writer_config))
                .await
                .expect("columnar writer task panicked")
                .map_err(BatchError::from)
        }
    })
    .await?;
    retries += attempts;
    result.local_path = Some(local_path.clone());

    result.state = BatchState::Uploading;
    let blob_key = spec.blob_key(range.batch_index);
    let file_size = tokio::fs::metadata(&local_path).await.map(|meta| meta.len()).unwrap_or(0);
    let (_, attempts) = run_retriable(ctx, range.batch_index, || {
        let object_store = ctx.object_store.clone();
        let local_path = local_path.clone();
        let blob_key = blob_key.clone();
        async move { object_store.upload(&local_path, &blob_key).await.map_err(BatchError::from) }
    })
    .await?;
    retries += attempts;
    ctx.metrics.add_bytes_uploaded(file_size);
    result.blob_key = Some(blob_key);
    result.retries = retries;
    ctx.metrics.add_retries(retries as u64);

    if let Err(err) = tokio::fs::remove_file(&local_path).await {
        warn!(batch_index = %range.batch_index, path = %local_path.display(), %err, "failed to remove local file after upload");
    }
    info!(batch_index = %range.batch_index, rows = result.rows_read, "batch done");

    Ok(())
}
