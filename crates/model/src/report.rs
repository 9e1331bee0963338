use crate::ids::{BatchIndex, JobId};
use crate::result::BatchResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Done,
    Failed,
}

/// The job report emitted on every terminal path (§6: "Job report
/// (stdout/JSON)"). `bytes_uploaded` and `total_retries` are the job's
/// `JobMetrics` snapshot folded in at build time; `model` stays
/// dependency-free of `engine-core`, so the caller passes the two counts
/// through rather than the snapshot type itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub total_rows: usize,
    pub elapsed_seconds: f64,
    pub rows_per_second: f64,
    pub batch_count: usize,
    pub bytes_uploaded: u64,
    pub total_retries: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: JobStatus,
    pub failed_batches: Vec<BatchIndex>,
}

impl JobReport {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        job_id: JobId,
        total_rows: usize,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        status: JobStatus,
        batch_results: &[BatchResult],
        bytes_uploaded: u64,
        total_retries: u64,
    ) -> Self {
        let elapsed_seconds = (finished_at - started_at).num_milliseconds().max(0) as f64 / 1000.0;
        let rows_per_second = if elapsed_seconds > 0.0 {
            total_rows as f64 / elapsed_seconds
        } else {
            0.0
        };
        let failed_batches = batch_results
            .iter()
            .filter(|b| b.is_failed())
            .map(|b| b.batch_index)
            .collect();

        Self {
            job_id,
            total_rows,
            elapsed_seconds,
            rows_per_second,
            batch_count: batch_results.len(),
            bytes_uploaded,
            total_retries,
            started_at,
            finished_at,
            status,
            failed_batches,
        }
    }
}
