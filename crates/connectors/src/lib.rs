pub mod destination;
pub mod error;
pub mod source;
mod type_map;

pub use destination::{DestinationConnector, IngestError, MySqlDestinationConnector};
pub use error::{
    ConnectError, IngestRuntimeError, IngestSetupError, QueryError, SchemaError,
};
pub use source::{MySqlSourceConnector, Row, SourceConnector};
