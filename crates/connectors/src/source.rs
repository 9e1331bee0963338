use crate::error::{is_transient_driver_error, ConnectError, QueryError, SchemaError};
use crate::type_map::from_mysql_column_type;
use async_trait::async_trait;
use model::{ColumnSchema, ColumnType, ConnectionConfig, Schema, Value};
use mysql_async::{prelude::Queryable, Error as DriverError, Pool, Row as MySqlRow};
use tracing::info;

const QUERY_TABLE_SCHEMA: &str = "\
SELECT COLUMN_NAME, DATA_TYPE, COLUMN_TYPE, IS_NULLABLE \
FROM INFORMATION_SCHEMA.COLUMNS \
WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
ORDER BY ORDINAL_POSITION";

const QUERY_ROW_COUNT: &str = "SELECT COUNT(*) FROM ";

const QUERY_PRIMARY_KEY: &str = "\
SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE \
WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY' \
ORDER BY ORDINAL_POSITION";

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

/// A single column value read back from `read_range`. Distinct from
/// `model::Value`: the connector decodes exactly what `describe()` already
/// told the caller to expect, so the type is already `ColumnType`-shaped.
pub type Row = Vec<Value>;

/// Pooled access to a relational source, read in disjoint, ordered ranges.
///
/// Mirrors the destination-side introspection surface of
/// [`crate::destination::DestinationConnector`] so Preflight can fetch both
/// schemas through the same shape and compare them structurally.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    async fn connect(config: &ConnectionConfig) -> Result<Self, ConnectError>
    where
        Self: Sized;

    async fn test(&self) -> Result<bool, QueryError>;

    async fn list_tables(&self) -> Result<Vec<String>, QueryError>;

    async fn describe(&self, table: &str) -> Result<Schema, SchemaError>;

    async fn row_count(&self, table: &str) -> Result<usize, QueryError>;

    async fn primary_key(&self, table: &str) -> Result<Vec<String>, QueryError>;

    /// Reads rows `[offset, offset + limit)` in a deterministic order
    /// (primary-key order when one exists). Callers are expected to have
    /// already checked `primary_key()` is non-empty for tables being read
    /// by more than one concurrent worker.
    async fn read_range(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Row>, QueryError>;

    async fn disconnect(self) -> Result<(), QueryError>;
}

/// MySQL wire-protocol source connector. Also the grounding for the
/// destination connector's introspection half, since the reference
/// destination dialect (SingleStore) speaks the same wire protocol.
#[derive(Clone)]
pub struct MySqlSourceConnector {
    pool: Pool,
    database: String,
}

impl MySqlSourceConnector {
    fn connection_url(config: &ConnectionConfig) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            config.user, config.secret, config.host, config.port, config.database
        )
    }

    pub(crate) fn pool(&self) -> &Pool {
        &self.pool
    }

    pub(crate) fn database(&self) -> &str {
        &self.database
    }
}

#[async_trait]
impl SourceConnector for MySqlSourceConnector {
    async fn connect(config: &ConnectionConfig) -> Result<Self, ConnectError> {
        let url = Self::connection_url(config);
        let pool = Pool::from_url(&url).map_err(|source| connect_err(config, source))?;

        // Eagerly probe a connection so bad credentials/host surface here,
        // in Preflight, rather than on the first worker's first read.
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

    async fn list_tables(&self) -> Result<Vec<String>, QueryError> {
        let mut conn = self.pool.get_conn().await.map_err(|source| query_err("SHOW TABLES", 0, source))?;
        conn.query("SHOW TABLES").await.map_err(|source| query_err("SHOW TABLES", 0, source))
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

    async fn primary_key(&self, table: &str) -> Result<Vec<String>, QueryError> {
        let mut conn = self.pool.get_conn().await.map_err(|source| query_err(QUERY_PRIMARY_KEY, 2, source))?;
        conn.exec(QUERY_PRIMARY_KEY, (&self.database, table))
            .await
            .map_err(|source| query_err(QUERY_PRIMARY_KEY, 2, source))
    }

    async fn read_range(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Row>, QueryError> {
        let primary_key = self.primary_key(table).await?;
        let order_by = if primary_key.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", primary_key.iter().map(|c| escape_identifier(c)).collect::<Vec<_>>().join(", "))
        };

        let statement = format!(
            "SELECT * FROM {}{} LIMIT {} OFFSET {}",
            escape_identifier(table),
            order_by,
            limit,
            offset
        );

        info!(%statement, "reading range");

        let mut conn = self.pool.get_conn().await.map_err(|source| query_err(statement.clone(), 0, source))?;
        let rows: Vec<MySqlRow> =
            conn.query(&statement).await.map_err(|source| query_err(statement.clone(), 0, source))?;

        rows.into_iter().map(|row| decode_row(&statement, row)).collect()
    }

    async fn disconnect(self) -> Result<(), QueryError> {
        self.pool.disconnect().await.map_err(|source| query_err("<disconnect>", 0, source))
    }
}

fn decode_row(statement: &str, row: MySqlRow) -> Result<Row, QueryError> {
    use mysql_async::Value as MyValue;

    let mut values = Vec::with_capacity(row.len());
    for column_index in 0..row.len() {
        let raw: MyValue = row.as_ref(column_index).cloned().unwrap_or(MyValue::NULL);
        let value = decode_value(raw).map_err(|detail| QueryError::Decode {
            statement: statement.to_string(),
            detail,
        })?;
        values.push(value);
    }
    Ok(values)
}

fn decode_value(raw: mysql_async::Value) -> Result<Value, String> {
    use mysql_async::Value as MyValue;
    match raw {
        MyValue::NULL => Ok(Value::Null),
        MyValue::Bytes(bytes) => String::from_utf8(bytes)
            .map(Value::String)
            .map_err(|err| format!("column is not valid UTF-8: {err}")),
        MyValue::Int(i) => Ok(Value::Int64(i)),
        MyValue::UInt(u) => Ok(Value::Int64(u as i64)),
        MyValue::Float(f) => Ok(Value::Float64(f as f64)),
        MyValue::Double(d) => Ok(Value::Float64(d)),
        MyValue::Date(year, month, day, hour, minute, second, micros) => {
            use chrono::{NaiveDate, TimeZone, Utc};
            NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                .and_then(|d| d.and_hms_micro_opt(hour as u32, minute as u32, second as u32, micros))
                .map(|naive| Value::Timestamp(Utc.from_utc_datetime(&naive)))
                .ok_or_else(|| format!("invalid date/time components: {year}-{month}-{day} {hour}:{minute}:{second}"))
        }
        MyValue::Time(..) => Err("TIME columns are not supported".to_string()),
    }
}

fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_backticks_in_identifiers() {
        assert_eq!(escape_identifier("weird`table"), "`weird``table`");
    }

    #[test]
    fn decodes_null_and_text_values() {
        assert_eq!(decode_value(mysql_async::Value::NULL), Ok(Value::Null));
        assert_eq!(
            decode_value(mysql_async::Value::Bytes(b"hello".to_vec())),
            Ok(Value::String("hello".to_string()))
        );
    }

    #[test]
    fn rejects_non_utf8_byte_columns() {
        assert!(decode_value(mysql_async::Value::Bytes(vec![0xff, 0xfe])).is_err());
    }
}
