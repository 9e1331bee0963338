pub mod client;
pub mod error;

pub use client::ObjectStoreClient;
pub use error::UploadError;
