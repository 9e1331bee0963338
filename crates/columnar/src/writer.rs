use crate::error::WriteError;
use arrow::array::{
    ArrayRef, BinaryBuilder, BooleanBuilder, Date32Builder, Decimal128Builder, Float64Builder,
    Int64Builder, StringBuilder, TimestampMicrosecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, TimeUnit};
use arrow::record_batch::RecordBatch;
use model::{ColumnSchema, ColumnType, Schema, Value};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Compression codec for the output Parquet file (§4.3, default snappy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionKind {
    None,
    #[default]
    Snappy,
    Gzip,
    Brotli,
    Lz4,
    Zstd,
}

impl From<CompressionKind> for Compression {
    fn from(kind: CompressionKind) -> Self {
        match kind {
            CompressionKind::None => Compression::UNCOMPRESSED,
            CompressionKind::Snappy => Compression::SNAPPY,
            CompressionKind::Gzip => Compression::GZIP(Default::default()),
            CompressionKind::Brotli => Compression::BROTLI(Default::default()),
            CompressionKind::Lz4 => Compression::LZ4,
            CompressionKind::Zstd => Compression::ZSTD(Default::default()),
        }
    }
}

/// Writer knobs named directly in §4.3: compression, row-group size,
/// statistics on/off.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub compression: CompressionKind,
    pub row_group_size: usize,
    pub statistics_enabled: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { compression: CompressionKind::Snappy, row_group_size: 100_000, statistics_enabled: true }
    }
}

fn arrow_type_for(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Int64 => DataType::Int64,
        ColumnType::Float64 => DataType::Float64,
        ColumnType::String => DataType::Utf8,
        ColumnType::Bool => DataType::Boolean,
        ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        ColumnType::Date => DataType::Date32,
        ColumnType::Decimal(precision, scale) => DataType::Decimal128(precision, scale as i8),
        ColumnType::Binary => DataType::Binary,
    }
}

fn arrow_schema_for(schema: &Schema) -> Arc<ArrowSchema> {
    let fields = schema
        .columns
        .iter()
        .map(|c| Field::new(&c.name, arrow_type_for(c.data_type), c.nullable))
        .collect::<Vec<_>>();
    Arc::new(ArrowSchema::new(fields))
}

/// Builds one Arrow column array from the column's declared type and the
/// per-row values at `column_index` across `rows`.
fn build_column(
    column: &ColumnSchema,
    column_index: usize,
    rows: &[Vec<Value>],
) -> Result<ArrayRef, WriteError> {
    macro_rules! value_at {
        ($row_index:expr) => {
            rows[$row_index].get(column_index).unwrap_or(&Value::Null)
        };
    }

    let array: ArrayRef = match column.data_type {
        ColumnType::Int64 => {
            let mut builder = Int64Builder::with_capacity(rows.len());
            for row_index in 0..rows.len() {
                match value_at!(row_index) {
                    Value::Int64(v) => builder.append_value(*v),
                    Value::Null => builder.append_null(),
                    other => return Err(type_mismatch(row_index, column, other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Float64 => {
            let mut builder = Float64Builder::with_capacity(rows.len());
            for row_index in 0..rows.len() {
                match value_at!(row_index) {
                    Value::Float64(v) => builder.append_value(*v),
                    Value::Null => builder.append_null(),
                    other => return Err(type_mismatch(row_index, column, other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::String => {
            let mut builder = StringBuilder::new();
            for row_index in 0..rows.len() {
                match value_at!(row_index) {
                    Value::String(v) => builder.append_value(v),
                    Value::Null => builder.append_null(),
                    other => return Err(type_mismatch(row_index, column, other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Bool => {
            let mut builder = BooleanBuilder::with_capacity(rows.len());
            for row_index in 0..rows.len() {
                match value_at!(row_index) {
                    Value::Bool(v) => builder.append_value(*v),
                    Value::Null => builder.append_null(),
                    other => return Err(type_mismatch(row_index, column, other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Timestamp => {
            let mut builder = TimestampMicrosecondBuilder::with_capacity(rows.len());
            for row_index in 0..rows.len() {
                match value_at!(row_index) {
                    Value::Timestamp(v) => builder.append_value(
                        v.timestamp() * 1_000_000 + i64::from(v.timestamp_subsec_micros()),
                    ),
                    Value::Null => builder.append_null(),
                    other => return Err(type_mismatch(row_index, column, other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Date => {
            let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            let mut builder = Date32Builder::with_capacity(rows.len());
            for row_index in 0..rows.len() {
                match value_at!(row_index) {
                    Value::Date(v) => builder.append_value((*v - epoch).num_days() as i32),
                    Value::Null => builder.append_null(),
                    other => return Err(type_mismatch(row_index, column, other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Decimal(precision, scale) => {
            let mut builder = Decimal128Builder::with_capacity(rows.len())
                .with_precision_and_scale(precision, scale as i8)
                .map_err(WriteError::from)?;
            for row_index in 0..rows.len() {
                match value_at!(row_index) {
                    Value::Decimal(v) => {
                        let scaled = (v * num_traits_pow10(scale)).round(0);
                        let unscaled = scaled.to_string().parse::<i128>().unwrap_or(0);
                        builder.append_value(unscaled);
                    }
                    Value::Null => builder.append_null(),
                    other => return Err(type_mismatch(row_index, column, other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Binary => {
            let mut builder = BinaryBuilder::new();
            for row_index in 0..rows.len() {
                match value_at!(row_index) {
                    Value::Binary(v) => builder.append_value(v),
                    Value::Null => builder.append_null(),
                    other => return Err(type_mismatch(row_index, column, other)),
                }
            }
            Arc::new(builder.finish())
        }
    };

    Ok(array)
}

fn num_traits_pow10(scale: u8) -> bigdecimal::BigDecimal {
    bigdecimal::BigDecimal::from(10i64.pow(scale as u32))
}

fn type_mismatch(row_index: usize, column: &ColumnSchema, _value: &Value) -> WriteError {
    WriteError::TypeMismatch {
        row_index,
        column: column.name.clone(),
        expected: column.data_type.to_string(),
    }
}

/// Serialises an in-memory record batch to a single Parquet file,
/// synchronously and off the main I/O path (the caller, a Batch Worker,
/// runs this on its own task).
pub struct ColumnarWriter;

impl ColumnarWriter {
    pub fn write(
        path: &Path,
        schema: &Schema,
        rows: &[Vec<Value>],
        config: &WriterConfig,
    ) -> Result<(), WriteError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| WriteError::Open { path: path.to_path_buf(), source })?;
        }

        let arrow_schema = arrow_schema_for(schema);
        let columns = schema
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| build_column(column, index, rows))
            .collect::<Result<Vec<_>, _>>()?;

        let batch = RecordBatch::try_new(arrow_schema.clone(), columns)?;

        let statistics = if config.statistics_enabled {
            EnabledStatistics::Chunk
        } else {
            EnabledStatistics::None
        };
        let properties = WriterProperties::builder()
            .set_compression(config.compression.into())
            .set_max_row_group_size(config.row_group_size)
            .set_statistics_enabled(statistics)
            .build();

        let file = File::create(path)
            .map_err(|source| WriteError::Open { path: path.to_path_buf(), source })?;
        let mut writer = ArrowWriter::try_new(file, arrow_schema, Some(properties))?;
        writer.write(&batch)?;
        writer.close()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ColumnSchema;

    fn sample_schema() -> Schema {
        Schema::new(vec![
            ColumnSchema { name: "id".to_string(), data_type: ColumnType::Int64, nullable: false },
            ColumnSchema { name: "name".to_string(), data_type: ColumnType::String, nullable: true },
        ])
    }

    #[test]
    fn writes_a_readable_parquet_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch_0.parquet");
        let schema = sample_schema();
        let rows = vec![
            vec![Value::Int64(1), Value::String("a".to_string())],
            vec![Value::Int64(2), Value::Null],
        ];

        ColumnarWriter::write(&path, &schema, &rows, &WriterConfig::default()).unwrap();

        assert!(path.exists());
        let file = File::open(&path).unwrap();
        let reader = parquet::file::reader::SerializedFileReader::new(file).unwrap();
        use parquet::file::reader::FileReader;
        assert_eq!(reader.metadata().file_metadata().num_rows(), 2);
    }

    #[test]
    fn rejects_value_kind_mismatch() {
        let schema = sample_schema();
        let rows = vec![vec![Value::String("oops".to_string()), Value::Null]];
        let err = build_column(&schema.columns[0], 0, &rows).unwrap_err();
        assert!(matches!(err, WriteError::TypeMismatch { .. }));
    }
}
