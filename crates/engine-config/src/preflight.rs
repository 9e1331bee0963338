use crate::error::SchemaMismatch;
use model::Schema;

/// The validation phase preceding any write (§4.7 Preflight): source and
/// destination schemas must be structurally equal -- same ordered column
/// list, same declared type per column -- before the job is allowed to
/// plan or execute.
pub struct SchemaGate;

impl SchemaGate {
    /// Returns `Ok(())` when `source` and `destination` are structurally
    /// equal, otherwise a `SchemaMismatch` describing the first divergence
    /// found (missing/extra column, reordered column, or differing type).
    pub fn check(table: &str, source: &Schema, destination: &Schema) -> Result<(), SchemaMismatch> {
        if source.structurally_equal(destination) {
            return Ok(());
        }

        Err(SchemaMismatch { table: table.to_string(), detail: Self::describe_divergence(source, destination) })
    }

    fn describe_divergence(source: &Schema, destination: &Schema) -> String {
        if source.columns.len() != destination.columns.len() {
            return format!(
                "column count differs: source has {}, destination has {}",
                source.columns.len(),
                destination.columns.len()
            );
        }

        for (source_col, dest_col) in source.columns.iter().zip(destination.columns.iter()) {
            if source_col.name != dest_col.name {
                return format!(
                    "column order/name mismatch: source has `{}`, destination has `{}` at the same position",
                    source_col.name, dest_col.name
                );
            }
            if source_col.data_type != dest_col.data_type {
                return format!(
                    "column `{}` type mismatch: source is {}, destination is {}",
                    source_col.name, source_col.data_type, dest_col.data_type
                );
            }
        }

        "schemas diverge".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{ColumnSchema, ColumnType};

    fn col(name: &str, ty: ColumnType) -> ColumnSchema {
        ColumnSchema { name: name.to_string(), data_type: ty, nullable: true }
    }

    #[test]
    fn identical_schemas_pass_the_gate() {
        let schema = Schema::new(vec![col("id", ColumnType::Int64), col("name", ColumnType::String)]);
        assert!(SchemaGate::check("t", &schema, &schema).is_ok());
    }

    #[test]
    fn type_string_divergence_fails_the_gate() {
        // Scenario S3: id:int,name:varchar vs id:int,name:text.
        let source = Schema::new(vec![col("id", ColumnType::Int64), col("name", ColumnType::String)]);
        let destination = Schema::new(vec![col("id", ColumnType::Int64), col("name", ColumnType::Binary)]);
        let err = SchemaGate::check("t", &source, &destination).unwrap_err();
        assert_eq!(err.table, "t");
        assert!(err.detail.contains("name"));
    }

    #[test]
    fn column_count_divergence_is_reported() {
        let source = Schema::new(vec![col("id", ColumnType::Int64)]);
        let destination =
            Schema::new(vec![col("id", ColumnType::Int64), col("extra", ColumnType::String)]);
        let err = SchemaGate::check("t", &source, &destination).unwrap_err();
        assert!(err.detail.contains("column count"));
    }
}
