use crate::schema::ColumnType;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Runtime column value. Used for row-count bookkeeping and schema/type
/// checks only -- the engine never transforms values row by row (that is
/// a non-goal), so this is deliberately smaller than the teacher's
/// `model::core::value::Value`, which also carries the row-transform
/// pipeline's `Json`/`Enum`/`StringArray` variants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Int64(i64),
    Float64(f64),
    Decimal(BigDecimal),
    String(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Binary(Vec<u8>),
    Null,
}

impl Value {
    pub fn data_type(&self) -> Option<ColumnType> {
        match self {
            Value::Int64(_) => Some(ColumnType::Int64),
            Value::Float64(_) => Some(ColumnType::Float64),
            Value::Decimal(_) => Some(ColumnType::Decimal(38, 10)),
            Value::String(_) => Some(ColumnType::String),
            Value::Bool(_) => Some(ColumnType::Bool),
            Value::Timestamp(_) => Some(ColumnType::Timestamp),
            Value::Date(_) => Some(ColumnType::Date),
            Value::Binary(_) => Some(ColumnType::Binary),
            Value::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}
