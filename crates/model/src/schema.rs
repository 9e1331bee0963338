use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed, engine-agnostic column type.
///
/// REDESIGN FLAG: the teacher's connectors keep a string-keyed `DataType`
/// map per dialect; here every source/destination adapter maps its native
/// type strings onto this fixed variant instead, so schema comparison in
/// Preflight is a structural `==` rather than a string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Int64,
    Float64,
    String,
    Bool,
    Timestamp,
    Date,
    Decimal(u8, u8),
    Binary,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int64 => write!(f, "Int64"),
            ColumnType::Float64 => write!(f, "Float64"),
            ColumnType::String => write!(f, "String"),
            ColumnType::Bool => write!(f, "Bool"),
            ColumnType::Timestamp => write!(f, "Timestamp"),
            ColumnType::Date => write!(f, "Date"),
            ColumnType::Decimal(p, s) => write!(f, "Decimal({p},{s})"),
            ColumnType::Binary => write!(f, "Binary"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: ColumnType,
    pub nullable: bool,
}

/// Ordered column list for one table, as introspected from a source or
/// destination engine. Two schemas are structurally equal iff the ordered
/// `(name, data_type)` sequences match; `nullable` is informational only
/// (the spec's schema gate does not key on it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnSchema>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self { columns }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Structural equality used by the Preflight schema gate: same
    /// columns, same order, same declared type. Nullability differences
    /// do not trip the gate.
    pub fn structurally_equal(&self, other: &Schema) -> bool {
        if self.columns.len() != other.columns.len() {
            return false;
        }
        self.columns
            .iter()
            .zip(other.columns.iter())
            .all(|(a, b)| a.name == b.name && a.data_type == b.data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: ColumnType) -> ColumnSchema {
        ColumnSchema { name: name.to_string(), data_type: ty, nullable: true }
    }

    #[test]
    fn identical_schemas_are_structurally_equal() {
        let a = Schema::new(vec![col("id", ColumnType::Int64), col("name", ColumnType::String)]);
        let b = Schema::new(vec![col("id", ColumnType::Int64), col("name", ColumnType::String)]);
        assert!(a.structurally_equal(&b));
    }

    #[test]
    fn differing_type_string_breaks_equality() {
        // id:int, name:varchar vs id:int, name:text -- mirrors scenario S3.
        let a = Schema::new(vec![col("id", ColumnType::Int64), col("name", ColumnType::String)]);
        let b = Schema::new(vec![col("id", ColumnType::Int64), col("name", ColumnType::Binary)]);
        assert!(!a.structurally_equal(&b));
    }

    #[test]
    fn column_order_matters() {
        let a = Schema::new(vec![col("id", ColumnType::Int64), col("name", ColumnType::String)]);
        let b = Schema::new(vec![col("name", ColumnType::String), col("id", ColumnType::Int64)]);
        assert!(!a.structurally_equal(&b));
    }
}
