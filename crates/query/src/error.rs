use thiserror::Error;

/// Query-string interpretation failure. Always a client error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Field '{0}' cannot be used in filters or sorting")]
    NotQueryable(String),

    #[error("Operator '{operator}' is not supported for field '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    #[error("Invalid value '{value}' for field '{field}': expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid {param} '{value}': expected a positive integer")]
    InvalidPagination { param: &'static str, value: String },

    #[error("Field selection cannot mix included and excluded fields")]
    MixedProjection,
}
