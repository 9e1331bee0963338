pub mod coordinator;
pub mod error;
pub mod worker;

pub use coordinator::{JobCoordinator, JobOutcome};
pub use error::{BatchError, JobError};
pub use worker::WorkerContext;
