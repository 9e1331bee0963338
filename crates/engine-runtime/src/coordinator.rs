use crate::error::JobError;
use crate::worker::{self, WorkerContext};
use chrono::Utc;
use columnar::WriterConfig;
use connectors::{DestinationConnector, SourceConnector};
use engine_config::SchemaGate;
use engine_core::{JobMetrics, RetryPolicy};
use model::{BatchIndex, BatchPlan, BatchResult, JobReport, JobSpec, JobStatus, Schema};
use object_store_client::ObjectStoreClient;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The job's terminal report plus, on a Failed outcome, the reason that
/// doesn't fit in `JobReport`'s wire shape (§6 only carries `failed_batches`
/// indices, not the underlying error).
pub struct JobOutcome {
    pub report: JobReport,
    pub error: Option<JobError>,
}

/// Top-level state machine (§4.7): Init → Preflight → Planning → Executing
/// → Ingesting → Verifying → Done/Failed, Cleanup on every path.
///
/// Built with dependency injection (§9 "flatten via DI at Coordinator
/// construction"): `source` and `destination` are already-connected
/// connectors handed in by the caller, never constructed internally. This
/// is what lets tests substitute in-memory fakes without the Coordinator
/// knowing a real wire driver exists.
pub struct JobCoordinator<S: SourceConnector, D: DestinationConnector> {
    spec: Arc<JobSpec>,
    source: Arc<S>,
    destination: Arc<D>,
    object_store: ObjectStoreClient,
    writer_config: WriterConfig,
    retry_policy: RetryPolicy,
    max_concurrency: usize,
    metrics: JobMetrics,
    cancel: CancellationToken,
}

fn default_max_concurrency() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4) * 2
}

impl<S, D> JobCoordinator<S, D>
where
    S: SourceConnector + 'static,
    D: DestinationConnector + 'static,
{
    pub fn new(spec: JobSpec, source: S, destination: D, object_store: ObjectStoreClient) -> Self {
        Self {
            spec: Arc::new(spec),
            source: Arc::new(source),
            destination: Arc::new(destination),
            object_store,
            writer_config: WriterConfig::default(),
            retry_policy: RetryPolicy::default(),
            max_concurrency: default_max_concurrency(),
            metrics: JobMetrics::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_writer_config(mut self, writer_config: WriterConfig) -> Self {
        self.writer_config = writer_config;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Caps worker concurrency; the default is `available CPUs * 2` per §4.7.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn metrics(&self) -> JobMetrics {
        self.metrics.clone()
    }

    /// A clone of the job's cancellation token. Call `.cancel()` on it from
    /// outside to abort every in-flight batch worker at its next suspension
    /// point (§5 Cancellation).
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn preflight(&self) -> Result<Schema, JobError> {
        info!(job_id = %self.spec.job_id, "preflight: testing connections");
        if !self.source.test().await? {
            return Err(JobError::Unresponsive { component: "source" });
        }
        if !self.destination.test().await? {
            return Err(JobError::Unresponsive { component: "destination" });
        }

        let source_schema = self.source.describe(&self.spec.source.table).await?;
        let dest_schema = self.destination.describe(&self.spec.destination.table).await?;
        SchemaGate::check(&self.spec.destination.table, &source_schema, &dest_schema)?;

        if self.max_concurrency > 1 {
            let primary_key = self.source.primary_key(&self.spec.source.table).await?;
            if primary_key.is_empty() {
                return Err(connectors::SchemaError::NoStableOrder { table: self.spec.source.table.clone() }.into());
            }
        }

        Ok(source_schema)
    }

    async fn plan(&self) -> Result<(usize, BatchPlan), JobError> {
        let total_rows = self.source.row_count(&self.spec.source.table).await?;
        let plan = BatchPlan::compute(total_rows, self.spec.batch_size);
        info!(job_id = %self.spec.job_id, total_rows, batch_count = plan.batch_count(), "planning complete");
        Ok((total_rows, plan))
    }

    /// Fans the plan's ranges out over a semaphore-bounded task set and
    /// joins all of them. Grounded in the teacher's producer/consumer join
    /// (`engine-runtime::execution::workers::spawn`), generalised from a
    /// fixed two-actor join to an N-way per-batch join.
    async fn execute(&self, plan: &BatchPlan, schema: Arc<Schema>) -> Vec<BatchResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let worker_ctx = Arc::new(WorkerContext {
            source: self.source.clone(),
            object_store: self.object_store.clone(),
            writer_config: self.writer_config.clone(),
            retry_policy: self.retry_policy.clone(),
            metrics: self.metrics.clone(),
            cancel: self.cancel.clone(),
        });

        let handles: Vec<(BatchIndex, tokio::task::JoinHandle<BatchResult>)> = plan
            .ranges
            .iter()
            .copied()
            .map(|range| {
                let semaphore = semaphore.clone();
                let worker_ctx = worker_ctx.clone();
                let spec = self.spec.clone();
                let schema = schema.clone();
                let handle = tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("semaphore is never closed during a run");
                    worker::run_batch(worker_ctx, spec, schema, range).await
                });
                (range.batch_index, handle)
            })
            .collect();

        let mut results = futures::future::join_all(handles.into_iter().map(|(batch_index, handle)| async move {
            match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    error!(%batch_index, %join_err, "batch worker task panicked");
                    let mut result = BatchResult::pending(batch_index);
                    result.state = model::BatchState::Failed;
                    result.error = Some(format!("worker task panicked: {join_err}"));
                    result
                }
            }
        }))
        .await;

        results.sort_by_key(|r| r.batch_index);
        results
    }

    async fn ingest(&self, source_schema: &Schema) -> Result<(), JobError> {
        info!(job_id = %self.spec.job_id, "ingesting: triggering destination bulk load");
        self.destination
            .bulk_ingest(&self.spec.destination.table, &self.spec.blob_glob(), &self.spec.blob_store, source_schema)
            .await
            .map_err(JobError::from)
    }

    async fn verify(&self, expected: usize) -> Result<(), JobError> {
        let found = self.destination.row_count(&self.spec.destination.table).await?;
        if found != expected {
            return Err(JobError::RowCountMismatch {
                table: self.spec.destination.table.clone(),
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Removes anything left under `exports/{job_id}/`. Runs on every
    /// terminal path regardless of which phase failed (§4.7 Cleanup,
    /// §8 property 6).
    async fn cleanup(&self) {
        let dir = self.spec.local_dir();
        match tokio::fs::metadata(&dir).await {
            Ok(_) => {
                if let Err(err) = tokio::fs::remove_dir_all(&dir).await {
                    warn!(path = %dir.display(), %err, "failed to remove job export directory during cleanup");
                }
            }
            Err(_) => {}
        }
    }

    async fn disconnect(self) {
        if let Ok(source) = Arc::try_unwrap(self.source) {
            if let Err(err) = source.disconnect().await {
                warn!(%err, "error disconnecting source");
            }
        }
        if let Ok(destination) = Arc::try_unwrap(self.destination) {
            if let Err(err) = destination.disconnect().await {
                warn!(%err, "error disconnecting destination");
            }
        }
    }

    /// Runs the job to a terminal state and returns its report. Consumes
    /// `self`: a `JobCoordinator` is single-use, mirroring the immutable,
    /// one-shot `JobSpec` it was built from.
    pub async fn run(self) -> JobOutcome {
        let started_at = Utc::now();
        let job_id = self.spec.job_id.clone();

        let outcome = self.run_phases().await;
        self.cleanup().await;

        let finished_at = Utc::now();
        let (total_rows, batch_results, error) = match outcome {
            Ok((total_rows, batch_results)) => (total_rows, batch_results, None),
            Err((total_rows, batch_results, err)) => (total_rows, batch_results, Some(err)),
        };

        let status = if error.is_none() { JobStatus::Done } else { JobStatus::Failed };
        if let Some(err) = &error {
            error!(%job_id, %err, "job failed");
        } else {
            info!(%job_id, total_rows, "job done");
        }

        let snapshot = self.metrics.snapshot();
        let report = JobReport::build(
            job_id,
            total_rows,
            started_at,
            finished_at,
            status,
            &batch_results,
            snapshot.bytes_uploaded,
            snapshot.retry_count,
        );

        self.disconnect().await;

        JobOutcome { report, error }
    }

    #[allow(clippy::type_complexity)]
    async fn run_phases(&self) -> Result<(usize, Vec<BatchResult>), (usize, Vec<BatchResult>, JobError)> {
        let source_schema = self.preflight().await.map_err(|err| (0, Vec::new(), err))?;
        let (total_rows, plan) = self.plan().await.map_err(|err| (0, Vec::new(), err))?;

        if plan.is_empty() {
            info!(job_id = %self.spec.job_id, "empty plan, short-circuiting to Done with zero rows");
            return Ok((0, Vec::new()));
        }

        let schema = Arc::new(source_schema.clone());
        let batch_results = self.execute(&plan, schema).await;

        let failed = batch_results.iter().filter(|b| b.is_failed()).count();
        if failed > 0 {
            let err = if self.cancel.is_cancelled() {
                JobError::Cancelled
            } else {
                JobError::BatchesFailed { failed, total: plan.batch_count() }
            };
            return Err((total_rows, batch_results, err));
        }

        if let Err(err) = self.ingest(&source_schema).await {
            return Err((total_rows, batch_results, err));
        }

        if let Err(err) = self.verify(total_rows).await {
            return Err((total_rows, batch_results, err));
        }

        Ok((total_rows, batch_results))
    }
}
