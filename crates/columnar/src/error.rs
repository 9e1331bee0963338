use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("row {row_index} column {column}: expected {expected}, got a different value kind")]
    TypeMismatch { row_index: usize, column: String, expected: String },

    #[error("failed to open {path}: {source}")]
    Open {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("arrow/parquet encoding error: {0}")]
    Encoding(#[from] parquet::errors::ParquetError),

    #[error("arrow array construction error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
