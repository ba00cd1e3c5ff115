//! Error types for the linkage engine.
//!
//! Only problems that make the remaining joins meaningless are errors. Row
//! level problems are counted in stage reports instead.

use cohort_model::ModelError;
use polars::prelude::{DataType, PolarsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    /// A required field is absent from a source table.
    #[error("schema error: required field '{field}' is missing from table '{table}'")]
    Schema { table: String, field: String },

    /// A field used as a timestamp does not hold dates.
    #[error("field '{field}' in table '{table}' has type {dtype}, expected a date")]
    TimeType {
        table: String,
        field: String,
        dtype: DataType,
    },

    /// Join suffixes leave two output columns with the same name.
    #[error("join onto table '{table}' would produce column '{column}' twice; use distinct join suffixes")]
    ColumnCollision { table: String, column: String },

    #[error(transparent)]
    Options(#[from] ModelError),

    #[error("DataFrame operation failed: {0}")]
    Polars(#[from] PolarsError),
}

impl LinkError {
    pub(crate) fn schema(table: &str, field: &str) -> Self {
        Self::Schema {
            table: table.to_string(),
            field: field.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_field_and_table() {
        let err = LinkError::schema("registry", "EXAMDATE");
        assert_eq!(
            err.to_string(),
            "schema error: required field 'EXAMDATE' is missing from table 'registry'"
        );
    }

    #[test]
    fn converts_polars_errors() {
        let err: LinkError = PolarsError::ColumnNotFound("RID".into()).into();
        assert!(matches!(err, LinkError::Polars(_)));
    }
}
