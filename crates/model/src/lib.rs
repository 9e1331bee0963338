pub mod ids;
pub mod job_spec;
pub mod plan;
pub mod report;
pub mod result;
pub mod schema;
pub mod value;

pub use ids::{BatchIndex, JobId};
pub use job_spec::{BlobStoreConfig, ConnectionConfig, JobSpec};
pub use plan::{BatchPlan, BatchRange};
pub use report::JobReport;
pub use result::{BatchResult, BatchState};
pub use schema::{ColumnSchema, ColumnType, Schema};
pub use value::Value;
