pub mod env;
pub mod error;
pub mod job_spec_file;
pub mod preflight;

pub use env::EnvManager;
pub use error::{ConfigError, SchemaMismatch};
pub use job_spec_file::load_job_spec;
pub use preflight::SchemaGate;
