use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

#[derive(Debug, Default)]
struct InnerMetrics {
    rows_read: AtomicU64,
    bytes_uploaded: AtomicU64,
    batches_done: AtomicU64,
    batches_failed: AtomicU64,
    retry_count: AtomicU64,
}

/// Atomic counters sampled into the `JobReport` at job completion. One
/// instance per job, shared (cheaply cloned) across every Batch Worker
/// task so counts are visible to the Coordinator without a lock.
#[derive(Debug, Clone)]
pub struct JobMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub rows_read: u64,
    pub bytes_uploaded: u64,
    pub batches_done: u64,
    pub batches_failed: u64,
    pub retry_count: u64,
}

impl JobMetrics {
    pub fn new() -> Self {
        Self { inner: Arc::new(InnerMetrics::default()) }
    }

    pub fn add_rows_read(&self, count: u64) {
        self.inner.rows_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_bytes_uploaded(&self, count: u64) {
        self.inner.bytes_uploaded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batches_done(&self) {
        self.inner.batches_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches_failed(&self) {
        self.inner.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_retries(&self, count: u64) {
        self.inner.retry_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_read: self.inner.rows_read.load(Ordering::Relaxed),
            bytes_uploaded: self.inner.bytes_uploaded.load(Ordering::Relaxed),
            batches_done: self.inner.batches_done.load(Ordering::Relaxed),
            batches_failed: self.inner.batches_failed.load(Ordering::Relaxed),
            retry_count: self.inner.retry_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for JobMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_clones() {
        let metrics = JobMetrics::new();
        let worker_handle = metrics.clone();
        worker_handle.add_rows_read(100);
        worker_handle.increment_batches_done();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rows_read, 100);
        assert_eq!(snapshot.batches_done, 1);
    }
}
