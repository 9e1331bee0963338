//! Coordinator-level integration tests driven against in-memory fakes
//! (`fakes::FakeSource`/`fakes::FakeDestination`) and a real `InMemory`
//! object store, covering the end-to-end scenarios S1-S6.

use crate::fakes::{FakeDestination, FakeSource, IngestOutcome};
use engine_core::RetryPolicy;
use engine_runtime::{JobCoordinator, JobError};
use futures::StreamExt;
use model::{BlobStoreConfig, ColumnSchema, ColumnType, ConnectionConfig, JobSpec, JobStatus, Schema, Value};
use object_store::memory::InMemory;
use object_store_client::ObjectStoreClient;
use std::sync::Arc;
use std::time::Duration;

fn sample_schema() -> Schema {
    Schema::new(vec![
        ColumnSchema { name: "id".to_string(), data_type: ColumnType::Int64, nullable: false },
        ColumnSchema { name: "name".to_string(), data_type: ColumnType::String, nullable: true },
    ])
}

fn row(id: i64, name: &str) -> Vec<Value> {
    vec![Value::Int64(id), Value::String(name.to_string())]
}

fn connection(table: &str) -> ConnectionConfig {
    ConnectionConfig {
        engine: "mysql".to_string(),
        host: "localhost".to_string(),
        port: 3306,
        user: "user".to_string(),
        secret: "secret".to_string(),
        database: "db".to_string(),
        table: table.to_string(),
    }
}

fn blob_store() -> BlobStoreConfig {
    BlobStoreConfig {
        bucket: "bkt".to_string(),
        key_prefix: "prefix".to_string(),
        access_id: "AKIA".to_string(),
        secret: "shh".to_string(),
        region: "us-east-1".to_string(),
    }
}

fn spec(batch_size: usize) -> JobSpec {
    JobSpec::new(connection("t"), connection("t"), blob_store()).with_batch_size(batch_size)
}

fn no_delay_retry(max_attempts: usize) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO)
}

fn object_store() -> (Arc<InMemory>, ObjectStoreClient) {
    let store = Arc::new(InMemory::new());
    let client = ObjectStoreClient::new(store.clone(), "bkt".to_string());
    (store, client)
}

async fn blob_count(store: &Arc<InMemory>) -> usize {
    store.list(None).collect::<Vec<_>>().await.len()
}

#[tokio::test]
async fn s1_three_rows_batch_size_two_produces_two_blobs_and_matching_destination() {
    let schema = sample_schema();
    let rows = vec![row(1, "a"), row(2, "b"), row(3, "c")];
    let source = FakeSource::new(schema.clone(), rows);
    let destination = FakeDestination::new(schema, 0, 3);
    let (store, client) = object_store();

    let coordinator = JobCoordinator::new(spec(2), source, destination, client);
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.status, JobStatus::Done);
    assert_eq!(outcome.report.total_rows, 3);
    assert_eq!(outcome.report.batch_count, 2);
    assert!(outcome.error.is_none());
    assert_eq!(blob_count(&store).await, 2);
    assert!(outcome.report.bytes_uploaded > 0, "metrics snapshot should be folded into the report");
}

#[tokio::test]
async fn s2_zero_rows_short_circuits_to_done() {
    let schema = sample_schema();
    let source = FakeSource::new(schema.clone(), Vec::new());
    let destination = FakeDestination::new(schema, 0, 0);
    let (store, client) = object_store();

    let coordinator = JobCoordinator::new(spec(1000), source, destination, client);
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.status, JobStatus::Done);
    assert_eq!(outcome.report.total_rows, 0);
    assert_eq!(outcome.report.batch_count, 0);
    assert_eq!(blob_count(&store).await, 0);
}

#[tokio::test]
async fn s3_schema_mismatch_fails_preflight_with_zero_blobs() {
    let source_schema = sample_schema();
    let mut dest_columns = source_schema.columns.clone();
    dest_columns[1].data_type = ColumnType::Binary;
    let dest_schema = Schema::new(dest_columns);

    let source = FakeSource::new(source_schema, vec![row(1, "a")]);
    let destination = FakeDestination::new(dest_schema, 0, 1);
    let (store, client) = object_store();

    let coordinator = JobCoordinator::new(spec(10), source, destination, client);
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.status, JobStatus::Failed);
    assert!(matches!(outcome.error, Some(JobError::SchemaMismatch(_))));
    assert_eq!(blob_count(&store).await, 0);
}

#[tokio::test]
async fn s4_transient_failure_retried_twice_then_succeeds() {
    let schema = sample_schema();
    let rows = vec![row(1, "a"), row(2, "b")];
    let source = FakeSource::new(schema.clone(), rows).fail_transiently_at(0, 2);
    let destination = FakeDestination::new(schema, 0, 2);
    let (_store, client) = object_store();

    let coordinator =
        JobCoordinator::new(spec(2), source, destination, client).with_retry_policy(no_delay_retry(5));
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.status, JobStatus::Done);
    assert_eq!(outcome.report.batch_count, 1);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.report.total_retries, 2);
}

#[tokio::test]
async fn s5_permanent_failure_fails_the_job_and_skips_ingest() {
    let schema = sample_schema();
    let rows = vec![row(1, "a"), row(2, "b")];
    let source = FakeSource::new(schema.clone(), rows).fail_permanently_at(0, 10);
    let destination = FakeDestination::new(schema, 0, 2);
    let (store, client) = object_store();

    let coordinator =
        JobCoordinator::new(spec(2), source, destination, client).with_retry_policy(no_delay_retry(3));
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.status, JobStatus::Failed);
    assert_eq!(outcome.report.failed_batches.len(), 1);
    assert_eq!(outcome.report.failed_batches[0].0, 0);
    assert!(matches!(outcome.error, Some(JobError::BatchesFailed { .. })));
    assert_eq!(blob_count(&store).await, 0);
}

#[tokio::test]
async fn s6_row_count_mismatch_after_ingest_fails_verification() {
    let schema = sample_schema();
    let rows = vec![row(1, "a"), row(2, "b"), row(3, "c")];
    let source = FakeSource::new(schema.clone(), rows);
    // destination reports one row short of the captured total_rows.
    let destination = FakeDestination::new(schema, 0, 2);
    let (_store, client) = object_store();

    let coordinator = JobCoordinator::new(spec(2), source, destination, client);
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.status, JobStatus::Failed);
    match outcome.error {
        Some(JobError::RowCountMismatch { expected, found, .. }) => {
            assert_eq!(expected, 3);
            assert_eq!(found, 2);
        }
        other => panic!("expected RowCountMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn cleanup_removes_the_job_export_directory_on_both_terminal_paths() {
    let schema = sample_schema();
    let rows = vec![row(1, "a"), row(2, "b")];
    let source = FakeSource::new(schema.clone(), rows);
    let destination = FakeDestination::new(schema, 0, 2);
    let (_store, client) = object_store();

    let job_spec = spec(2);
    let export_dir = job_spec.local_dir();

    let coordinator = JobCoordinator::new(job_spec, source, destination, client);
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.status, JobStatus::Done);
    assert!(!export_dir.exists(), "export directory should be removed by cleanup");
}

#[tokio::test]
async fn unresponsive_source_fails_preflight() {
    let schema = sample_schema();
    let source = FakeSource::new(schema.clone(), Vec::new()).unresponsive();
    let destination = FakeDestination::new(schema, 0, 0);
    let (_store, client) = object_store();

    let coordinator = JobCoordinator::new(spec(10), source, destination, client);
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.status, JobStatus::Failed);
    assert!(matches!(outcome.error, Some(JobError::Unresponsive { component: "source" })));
}

#[tokio::test]
async fn ingest_setup_failure_fails_the_job_after_all_batches_succeed() {
    let schema = sample_schema();
    let rows = vec![row(1, "a"), row(2, "b")];
    let source = FakeSource::new(schema.clone(), rows);
    let destination =
        FakeDestination::new(schema, 0, 2).with_ingest_outcome(IngestOutcome::FailsSetup("pipeline exists".to_string()));
    let (store, client) = object_store();

    let coordinator = JobCoordinator::new(spec(2), source, destination, client);
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.status, JobStatus::Failed);
    assert!(matches!(outcome.error, Some(JobError::Ingest(_))));
    // batches ran to completion before ingest was attempted.
    assert_eq!(blob_count(&store).await, 1);
}

#[tokio::test]
async fn cancelling_before_execution_fails_the_job_as_cancelled() {
    let schema = sample_schema();
    let rows = vec![row(1, "a"), row(2, "b")];
    let source = FakeSource::new(schema.clone(), rows);
    let destination = FakeDestination::new(schema, 0, 2);
    let (store, client) = object_store();

    let coordinator = JobCoordinator::new(spec(2), source, destination, client);
    coordinator.cancel_handle().cancel();
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.status, JobStatus::Failed);
    assert!(matches!(outcome.error, Some(JobError::Cancelled)));
    assert_eq!(blob_count(&store).await, 0);
}
