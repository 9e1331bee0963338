use async_trait::async_trait;
use connectors::{
    ConnectError, DestinationConnector, IngestError, IngestRuntimeError, IngestSetupError,
    QueryError, Row, SchemaError, SourceConnector,
};
use model::{BlobStoreConfig, ConnectionConfig, Schema};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory stand-in for a relational source. Tests build one directly
/// (dependency injection per `JobCoordinator::new`) rather than going
/// through `connect()`, which exists only to satisfy the trait.
pub struct FakeSource {
    schema: Schema,
    rows: Vec<Row>,
    primary_key: Vec<String>,
    responsive: bool,
    /// offset -> (remaining induced failures, whether they're transient).
    /// Lets a test make a given range's first N reads fail before it
    /// succeeds (S4), or fail every time up to the retry ceiling (S5).
    failures: Mutex<HashMap<usize, (usize, bool)>>,
}

impl FakeSource {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self { schema, rows, primary_key: vec!["id".to_string()], responsive: true, failures: Mutex::new(HashMap::new()) }
    }

    pub fn unresponsive(mut self) -> Self {
        self.responsive = false;
        self
    }

    pub fn without_primary_key(mut self) -> Self {
        self.primary_key = Vec::new();
        self
    }

    /// The read at `offset` fails `count` times with a transient error
    /// before succeeding.
    pub fn fail_transiently_at(self, offset: usize, count: usize) -> Self {
        self.failures.lock().unwrap().insert(offset, (count, true));
        self
    }

    /// The read at `offset` fails every attempt, exhausting the retry
    /// policy (it is still classified transient so it's actually retried,
    /// rather than short-circuiting on the first attempt).
    pub fn fail_permanently_at(self, offset: usize, attempts: usize) -> Self {
        self.failures.lock().unwrap().insert(offset, (attempts, true));
        self
    }
}

#[async_trait]
impl SourceConnector for FakeSource {
    async fn connect(_config: &ConnectionConfig) -> Result<Self, ConnectError> {
        Ok(Self::new(Schema::new(Vec::new()), Vec::new()))
    }

    async fn test(&self) -> Result<bool, QueryError> {
        Ok(self.responsive)
    }

    async fn list_tables(&self) -> Result<Vec<String>, QueryError> {
        Ok(Vec::new())
    }

    async fn describe(&self, _table: &str) -> Result<Schema, SchemaError> {
        Ok(self.schema.clone())
    }

    async fn row_count(&self, _table: &str) -> Result<usize, QueryError> {
        Ok(self.rows.len())
    }

    async fn primary_key(&self, _table: &str) -> Result<Vec<String>, QueryError> {
        Ok(self.primary_key.clone())
    }

    async fn read_range(&self, _table: &str, offset: usize, limit: usize) -> Result<Vec<Row>, QueryError> {
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some((remaining, transient)) = failures.get_mut(&offset) {
                if *remaining > 0 {
                    *remaining -= 1;
                    let statement = format!("FAKE SELECT ... OFFSET {offset} LIMIT {limit}");
                    return Err(QueryError::driver(statement, 0, *transient, "injected failure"));
                }
            }
        }

        if offset >= self.rows.len() {
            return Ok(Vec::new());
        }
        let end = (offset + limit).min(self.rows.len());
        Ok(self.rows[offset..end].to_vec())
    }

    async fn disconnect(self) -> Result<(), QueryError> {
        Ok(())
    }
}

/// In-memory stand-in for a destination. Ingest just flips a flag rather
/// than actually reading blob storage -- the round-trip the real
/// `bulk_ingest` performs is connectors-crate territory and already has
/// its own tests (`render_pipeline_statements`, coercion detection).
pub struct FakeDestination {
    schema: Schema,
    responsive: bool,
    row_count_before: usize,
    row_count_after: usize,
    ingest_outcome: IngestOutcome,
    ingested: AtomicBool,
    ingest_calls: AtomicUsize,
}

pub enum IngestOutcome {
    Succeeds,
    FailsSetup(String),
    FailsRuntime(String),
}

impl FakeDestination {
    pub fn new(schema: Schema, row_count_before: usize, row_count_after: usize) -> Self {
        Self {
            schema,
            responsive: true,
            row_count_before,
            row_count_after,
            ingest_outcome: IngestOutcome::Succeeds,
            ingested: AtomicBool::new(false),
            ingest_calls: AtomicUsize::new(0),
        }
    }

    pub fn unresponsive(mut self) -> Self {
        self.responsive = false;
        self
    }

    pub fn with_ingest_outcome(mut self, outcome: IngestOutcome) -> Self {
        self.ingest_outcome = outcome;
        self
    }

    pub fn ingest_call_count(&self) -> usize {
        self.ingest_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DestinationConnector for FakeDestination {
    async fn connect(_config: &ConnectionConfig) -> Result<Self, ConnectError> {
        Ok(Self::new(Schema::new(Vec::new()), 0, 0))
    }

    async fn test(&self) -> Result<bool, QueryError> {
        Ok(self.responsive)
    }

    async fn describe(&self, _table: &str) -> Result<Schema, SchemaError> {
        Ok(self.schema.clone())
    }

    async fn row_count(&self, _table: &str) -> Result<usize, QueryError> {
        if self.ingested.load(Ordering::SeqCst) {
            Ok(self.row_count_after)
        } else {
            Ok(self.row_count_before)
        }
    }

    async fn bulk_ingest(
        &self,
        _table: &str,
        _blob_glob: &str,
        _blob_store: &BlobStoreConfig,
        _source_schema: &Schema,
    ) -> Result<(), IngestError> {
        self.ingest_calls.fetch_add(1, Ordering::SeqCst);
        match &self.ingest_outcome {
            IngestOutcome::Succeeds => {
                self.ingested.store(true, Ordering::SeqCst);
                Ok(())
            }
            IngestOutcome::FailsSetup(detail) => Err(IngestError::from(IngestSetupError::Driver {
                pipeline: "fake_pipeline".to_string(),
                detail: detail.clone(),
            })),
            IngestOutcome::FailsRuntime(detail) => {
                Err(IngestError::from(IngestRuntimeError::PipelineFailed {
                    pipeline: "fake_pipeline".to_string(),
                    detail: detail.clone(),
                }))
            }
        }
    }

    async fn disconnect(self) -> Result<(), QueryError> {
        Ok(())
    }
}
