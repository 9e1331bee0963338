use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read env file {path}: {source}")]
    ReadFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid env file: empty key at line {line}")]
    EmptyKey { line: usize },

    #[error("invalid env file: malformed line {line} (expected KEY=VALUE)")]
    MalformedLine { line: usize },

    #[error("missing required setting: {0}")]
    MissingSetting(String),

    #[error("invalid job spec JSON at {path}: {detail}")]
    InvalidJson { path: std::path::PathBuf, detail: String },
}

/// Source and destination schemas diverge (column set, order, or declared
/// type) -- the Preflight gate named in §8 property 3.
#[derive(Debug, Error)]
#[error("schema mismatch on table {table}: {detail}")]
pub struct SchemaMismatch {
    pub table: String,
    pub detail: String,
}
