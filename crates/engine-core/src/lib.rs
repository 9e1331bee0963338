pub mod metrics;
pub mod retry;

pub use metrics::{JobMetrics, MetricsSnapshot};
pub use retry::{RetryDisposition, RetryError, RetryPolicy};
