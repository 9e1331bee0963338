pub mod error;
pub mod writer;

pub use error::WriteError;
pub use writer::{ColumnarWriter, CompressionKind, WriterConfig};
