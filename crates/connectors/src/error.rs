use thiserror::Error;

/// Failure to establish or lease a pooled connection (bad credentials, host
/// unreachable, pool exhausted).
///
/// Carries the driver's message as `detail` rather than the driver's
/// concrete error type: §6 generalises the source protocol to "any
/// ANSI-SQL engine exposing LIMIT/OFFSET, DESCRIBE, and
/// INFORMATION_SCHEMA.KEY_COLUMN_USAGE", so this type must not be pinned
/// to one wire driver. Each dialect's connector classifies its own errors
/// into `transient` before they cross this boundary.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to connect to {engine} at {host}:{port}: {detail}")]
    Driver { engine: String, host: String, port: u16, detail: String, transient: bool },
}

/// A statement failed to execute or its results could not be decoded.
/// Carries the offending statement and parameter count for logging --
/// never the parameter values themselves, which may hold row data.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query failed: {statement} ({param_count} params): {detail}")]
    Driver { statement: String, param_count: usize, detail: String, transient: bool },

    #[error("unexpected row shape for {statement}: {detail}")]
    Decode { statement: String, detail: String },
}

impl QueryError {
    pub fn driver(
        statement: impl Into<String>,
        param_count: usize,
        transient: bool,
        detail: impl ToString,
    ) -> Self {
        QueryError::Driver { statement: statement.into(), param_count, detail: detail.to_string(), transient }
    }

    /// Transient failures (connection reset, lock wait timeout, deadlock)
    /// are retriable; malformed statements and decode failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            QueryError::Driver { transient, .. } => *transient,
            QueryError::Decode { .. } => false,
        }
    }
}

pub(crate) fn is_transient_driver_error(err: &mysql_async::Error) -> bool {
    match err {
        mysql_async::Error::Io(_) => true,
        mysql_async::Error::Driver(_) => true,
        mysql_async::Error::Server(server_err) => {
            // 1205 lock wait timeout, 1213 deadlock, 1040 too many connections.
            matches!(server_err.code, 1205 | 1213 | 1040)
        }
        _ => false,
    }
}

/// Schema introspection failed or returned a shape Preflight cannot reason
/// about (missing primary key with no explicit ordering column, empty
/// column list).
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table {table} does not exist in database {database}")]
    TableNotFound { database: String, table: String },

    #[error(
        "table {table} has no primary key and no explicit ordering column was \
         supplied; parallel range reads cannot guarantee disjoint ranges"
    )]
    NoStableOrder { table: String },

    #[error("unrecognised column type {native_type} on {table}.{column}")]
    UnmappedType { table: String, column: String, native_type: String },
}

/// Pipeline creation on the destination failed before it ever ran.
#[derive(Debug, Error)]
pub enum IngestSetupError {
    #[error("failed to create pipeline {pipeline}: {detail}")]
    Driver { pipeline: String, detail: String },
}

/// Pipeline was created and started but terminated in an error state.
#[derive(Debug, Error)]
pub enum IngestRuntimeError {
    #[error("pipeline {pipeline} failed: {detail}")]
    PipelineFailed { pipeline: String, detail: String },

    #[error("pipeline {pipeline} did not reach a terminal state: {detail}")]
    Driver { pipeline: String, detail: String },
}
