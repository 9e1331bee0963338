use crate::error::{
    is_transient_driver_error, ConnectError, IngestRuntimeError, IngestSetupError, QueryError, SchemaError,
};
use crate::type_map::from_mysql_column_type;
use async_trait::async_trait;
use model::{BlobStoreConfig, ColumnSchema, ColumnType, ConnectionConfig, Schema};
use mysql_async::{prelude::Queryable, Error as DriverError, Pool, Row as MySqlRow};
use tracing::info;

const QUERY_TABLE_SCHEMA: &str = "\
SELECT COLUMN_NAME, DATA_TYPE, COLUMN_TYPE, IS_NULLABLE \
FROM INFORMATION_SCHEMA.COLUMNS \
WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
ORDER BY ORDINAL_POSITION";

const QUERY_ROW_COUNT: &str = "SELECT COUNT(*) FROM ";

fn connect_err(config: &ConnectionConfig, source: DriverError) -> ConnectError {
    let transient = is_transient_driver_error(&source);
    ConnectError::Driver {
        engine: config.engine.clone(),
        host: config.host.clone(),
        port: config.port,
        detail: source.to_string(),
        transient,
    }
}

fn query_err(statement: impl Into<String>, param_count: usize, source: DriverError) -> QueryError {
    let transient = is_transient_driver_error(&source);
    QueryError::driver(statement, param_count, transient, source)
}

/// Same introspection surface as [`crate::source::SourceConnector`] plus
/// the bulk-load directive described in §6 of the external interfaces
/// (the reference dialect is SingleStore's `PIPELINE`).
#[async_trait]
pub trait DestinationConnector: Send + Sync {
    async fn connect(config: &ConnectionConfig) -> Result<Self, ConnectError>
    where
        Self: Sized;

    async fn test(&self) -> Result<bool, QueryError>;

    async fn describe(&self, table: &str) -> Result<Schema, SchemaError>;

    async fn row_count(&self, table: &str) -> Result<usize, QueryError>;

    /// Creates (or replaces) a named pipeline bound to `blob_glob`, starts
    /// it synchronously, and reports terminal success/failure. Column
    /// mapping and any timestamp coercion are derived from `describe()`.
    async fn bulk_ingest(
        &self,
        table: &str,
        blob_glob: &str,
        blob_store: &BlobStoreConfig,
        source_schema: &Schema,
    ) -> Result<(), IngestError>;

    async fn disconnect(self) -> Result<(), QueryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Setup(#[from] IngestSetupError),
    #[error(transparent)]
    Runtime(#[from] IngestRuntimeError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Clone)]
pub struct MySqlDestinationConnector {
    pool: Pool,
    database: String,
}

impl MySqlDestinationConnector {
    fn connection_url(config: &ConnectionConfig) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            config.user, config.secret, config.host, config.port, config.database
        )
    }

    /// Renders the two-statement PIPELINE directive: `CREATE OR REPLACE
    /// PIPELINE ... FORMAT PARQUET (...)` followed by `START PIPELINE ...
    /// FOREGROUND`. The writer stores `Timestamp` columns as int64
    /// microseconds (`columnar::writer`'s `TimestampMicrosecondBuilder`), so
    /// every destination column typed `Timestamp` is bound to a staging
    /// variable (`@col <- col`) instead of loaded directly, and converted
    /// back with a `FROM_UNIXTIME(@col/1_000_000)` `SET` clause.
    fn render_pipeline_statements(
        table: &str,
        pipeline_name: &str,
        blob_glob: &str,
        blob_store: &BlobStoreConfig,
        dest_schema: &Schema,
        source_schema: &Schema,
    ) -> (String, String) {
        let coerced = coercions(dest_schema, source_schema);

        let column_mapping = dest_schema
            .columns
            .iter()
            .map(|c| {
                if coerced.contains(&c.name.as_str()) {
                    format!("@{0} <- {0}", c.name)
                } else {
                    format!("{0} <- {0}", c.name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let set_clauses = coerced
            .iter()
            .map(|column| format!("{column} = FROM_UNIXTIME(@{column}/1_000_000)"))
            .collect::<Vec<_>>();

        let config = format!(r#"{{"region": "{}"}}"#, blob_store.region);
        let credentials = format!(
            r#"{{"aws_access_key_id":"{}","aws_secret_access_key":"{}"}}"#,
            blob_store.access_id, blob_store.secret
        );

        let mut create = format!(
            "CREATE OR REPLACE PIPELINE {pipeline_name}\n  \
             AS LOAD DATA S3 '{blob_glob}'\n  \
             CONFIG '{config}'\n  \
             CREDENTIALS '{credentials}'\n  \
             INTO TABLE {table}\n  \
             FORMAT PARQUET ( {column_mapping} )"
        );
        if !set_clauses.is_empty() {
            create.push_str(&format!("\n  SET {}", set_clauses.join(", ")));
        }
        create.push(';');

        let start = format!("START PIPELINE {pipeline_name} FOREGROUND;");
        (create, start)
    }
}

/// Destination columns typed `Timestamp` that also exist on the source
/// side. Preflight's schema gate already requires source and destination
/// types to match exactly, so a `Timestamp` destination column always
/// means the stored Parquet column is microsecond-epoch `Int64` underneath
/// (per the writer's encoding), not that the two sides disagree.
fn coercions<'a>(dest_schema: &'a Schema, source_schema: &'a Schema) -> Vec<&'a str> {
    dest_schema
        .columns
        .iter()
        .filter_map(|dest_col| {
            source_schema.get(&dest_col.name)?;
            (dest_col.data_type == ColumnType::Timestamp).then_some(dest_col.name.as_str())
        })
        .collect()
}

#[async_trait]
impl DestinationConnector for MySqlDestinationConnector {
    async fn connect(config: &ConnectionConfig) -> Result<Self, ConnectError> {
        let url = Self::connection_url(config);
        let pool = Pool::from_url(&url).map_err(|source| connect_err(config, source))?;

        let mut conn = pool.get_conn().await.map_err(|source| connect_err(config, source))?;
        conn.query_drop("SELECT 1").await.map_err(|source| connect_err(config, source))?;
        drop(conn);

        Ok(Self { pool, database: config.database.clone() })
    }

    async fn test(&self) -> Result<bool, QueryError> {
        let mut conn = self.pool.get_conn().await.map_err(|source| query_err("SELECT 1", 0, source))?;
        let row: Option<i64> =
            conn.query_first("SELECT 1").await.map_err(|source| query_err("SELECT 1", 0, source))?;
        Ok(row == Some(1))
    }

    async fn describe(&self, table: &str) -> Result<Schema, SchemaError> {
        let mut conn = self.pool.get_conn().await.map_err(|_| SchemaError::TableNotFound {
            database: self.database.clone(),
            table: table.to_string(),
        })?;

        let rows: Vec<MySqlRow> = conn
            .exec(QUERY_TABLE_SCHEMA, (&self.database, table))
            .await
            .map_err(|_| SchemaError::TableNotFound {
                database: self.database.clone(),
                table: table.to_string(),
            })?;

        if rows.is_empty() {
            return Err(SchemaError::TableNotFound {
                database: self.database.clone(),
                table: table.to_string(),
            });
        }

        let mut columns = Vec::with_capacity(rows.len());
        for mut row in rows {
            let name: String = row.take("COLUMN_NAME").unwrap_or_default();
            let data_type: String = row.take("DATA_TYPE").unwrap_or_default();
            let column_type: String = row.take("COLUMN_TYPE").unwrap_or_default();
            let is_nullable: String = row.take("IS_NULLABLE").unwrap_or_default();

            let data_type: ColumnType =
                from_mysql_column_type(&data_type, &column_type).ok_or_else(|| {
                    SchemaError::UnmappedType {
                        table: table.to_string(),
                        column: name.clone(),
                        native_type: column_type.clone(),
                    }
                })?;

            columns.push(ColumnSchema { name, data_type, nullable: is_nullable == "YES" });
        }

        Ok(Schema::new(columns))
    }

    async fn row_count(&self, table: &str) -> Result<usize, QueryError> {
        let statement = format!("{QUERY_ROW_COUNT}{}", escape_identifier(table));
        let mut conn = self.pool.get_conn().await.map_err(|source| query_err(statement.clone(), 0, source))?;
        let count: Option<i64> =
            conn.query_first(&statement).await.map_err(|source| query_err(statement.clone(), 0, source))?;
        Ok(count.unwrap_or(0).max(0) as usize)
    }

    async fn bulk_ingest(
        &self,
        table: &str,
        blob_glob: &str,
        blob_store: &BlobStoreConfig,
        source_schema: &Schema,
    ) -> Result<(), IngestError> {
        let dest_schema = self.describe(table).await?;
        let pipeline_name = format!("{table}_pipeline");

        let (create, start) = Self::render_pipeline_statements(
            table,
            &pipeline_name,
            blob_glob,
            blob_store,
            &dest_schema,
            source_schema,
        );

        info!(pipeline = %pipeline_name, %blob_glob, "creating bulk-ingest pipeline");

        let mut conn = self.pool.get_conn().await.map_err(|source| IngestSetupError::Driver {
            pipeline: pipeline_name.clone(),
            detail: source.to_string(),
        })?;

        conn.query_drop(&create).await.map_err(|source| IngestSetupError::Driver {
            pipeline: pipeline_name.clone(),
            detail: source.to_string(),
        })?;

        info!(pipeline = %pipeline_name, "starting pipeline in foreground");

        conn.query_drop(&start).await.map_err(|source| IngestRuntimeError::Driver {
            pipeline: pipeline_name.clone(),
            detail: source.to_string(),
        })?;

        Ok(())
    }

    async fn disconnect(self) -> Result<(), QueryError> {
        self.pool.disconnect().await.map_err(|source| query_err("<disconnect>", 0, source))
    }
}

fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ColumnType;

    fn col(name: &str, ty: ColumnType) -> ColumnSchema {
        ColumnSchema { name: name.to_string(), data_type: ty, nullable: true }
    }

    #[test]
    fn detects_timestamp_coercion_present_on_both_sides() {
        let source = Schema::new(vec![col("id", ColumnType::Int64), col("created_at", ColumnType::Timestamp)]);
        let dest = Schema::new(vec![col("id", ColumnType::Int64), col("created_at", ColumnType::Timestamp)]);
        let found = coercions(&dest, &source);
        assert_eq!(found, vec!["created_at"]);
    }

    #[test]
    fn no_coercion_for_non_timestamp_columns() {
        let schema = Schema::new(vec![col("id", ColumnType::Int64)]);
        assert!(coercions(&schema, &schema).is_empty());
    }

    #[test]
    fn no_coercion_when_column_is_absent_from_the_source() {
        let source = Schema::new(vec![col("id", ColumnType::Int64)]);
        let dest = Schema::new(vec![col("id", ColumnType::Int64), col("created_at", ColumnType::Timestamp)]);
        assert!(coercions(&dest, &source).is_empty());
    }

    #[test]
    fn renders_both_pipeline_statements_with_timestamp_staging_and_set_clause() {
        let source = Schema::new(vec![col("id", ColumnType::Int64), col("created_at", ColumnType::Timestamp)]);
        let dest = Schema::new(vec![col("id", ColumnType::Int64), col("created_at", ColumnType::Timestamp)]);
        let blob_store = BlobStoreConfig {
            bucket: "bkt".to_string(),
            key_prefix: "prefix".to_string(),
            access_id: "AKIA".to_string(),
            secret: "shh".to_string(),
            region: "us-east-1".to_string(),
        };
        let (create, start) = MySqlDestinationConnector::render_pipeline_statements(
            "events",
            "events_pipeline",
            "bkt/prefix/job-1/*.parquet",
            &blob_store,
            &dest,
            &source,
        );
        assert!(create.contains("CREATE OR REPLACE PIPELINE events_pipeline"));
        assert!(create.contains("FORMAT PARQUET"));
        assert!(create.contains("id <- id"));
        assert!(create.contains("@created_at <- created_at"));
        assert!(create.contains("SET created_at = FROM_UNIXTIME(@created_at/1_000_000)"));
        assert_eq!(start, "START PIPELINE events_pipeline FOREGROUND;");
    }
}
