//! Maps MySQL/SingleStore `INFORMATION_SCHEMA.COLUMNS.DATA_TYPE` strings
//! onto the closed `ColumnType` variant, the one mapping function each
//! dialect goes through (§9 Design Notes: "encode as a closed tagged
//! variant ... with an explicit mapping function per source/destination
//! pair"). Source and destination share this mapping since both speak the
//! MySQL wire protocol.

use model::ColumnType;

/// Parses a decimal column's `(precision, scale)` out of
/// `COLUMN_TYPE` (e.g. `decimal(10,2)`); falls back to `(38, 10)` when the
/// engine omits it (some MySQL-compatible dialects report bare `decimal`).
fn decimal_precision_scale(column_type: &str) -> (u8, u8) {
    let open = column_type.find('(');
    let close = column_type.find(')');
    if let (Some(open), Some(close)) = (open, close) {
        if close > open {
            let inner = &column_type[open + 1..close];
            let mut parts = inner.split(',');
            let precision = parts.next().and_then(|p| p.trim().parse().ok());
            let scale = parts.next().and_then(|s| s.trim().parse().ok());
            if let (Some(precision), Some(scale)) = (precision, scale) {
                return (precision, scale);
            }
        }
    }
    (38, 10)
}

/// Maps a `DATA_TYPE` string (lowercase, no length/precision suffix) plus
/// the full `COLUMN_TYPE` string (which does carry precision/scale and the
/// `unsigned` qualifier) onto a `ColumnType`. Returns `None` for types this
/// engine has no representation for (geometry, JSON, enum/set) -- callers
/// surface that as `SchemaError::UnmappedType`.
pub fn from_mysql_column_type(data_type: &str, column_type: &str) -> Option<ColumnType> {
    match data_type.to_ascii_lowercase().as_str() {
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
            Some(ColumnType::Int64)
        }
        "float" | "double" | "double precision" => Some(ColumnType::Float64),
        "decimal" | "numeric" => {
            let (precision, scale) = decimal_precision_scale(column_type);
            Some(ColumnType::Decimal(precision, scale))
        }
        "varchar" | "char" | "text" | "tinytext" | "mediumtext" | "longtext" => {
            Some(ColumnType::String)
        }
        "bool" | "boolean" => Some(ColumnType::Bool),
        "timestamp" | "datetime" => Some(ColumnType::Timestamp),
        "date" => Some(ColumnType::Date),
        "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => {
            Some(ColumnType::Binary)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_integer_families_to_int64() {
        assert_eq!(from_mysql_column_type("bigint", "bigint(20)"), Some(ColumnType::Int64));
        assert_eq!(from_mysql_column_type("int", "int(11)"), Some(ColumnType::Int64));
    }

    #[test]
    fn parses_decimal_precision_and_scale() {
        assert_eq!(
            from_mysql_column_type("decimal", "decimal(10,2)"),
            Some(ColumnType::Decimal(10, 2))
        );
    }

    #[test]
    fn decimal_without_precision_falls_back_to_default() {
        assert_eq!(from_mysql_column_type("decimal", "decimal"), Some(ColumnType::Decimal(38, 10)));
    }

    #[test]
    fn varchar_and_text_both_map_to_string() {
        assert_eq!(from_mysql_column_type("varchar", "varchar(255)"), Some(ColumnType::String));
        assert_eq!(from_mysql_column_type("text", "text"), Some(ColumnType::String));
    }

    #[test]
    fn unrecognised_type_maps_to_none() {
        assert_eq!(from_mysql_column_type("geometry", "geometry"), None);
        assert_eq!(from_mysql_column_type("json", "json"), None);
    }
}
