use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unsupported operator '{operator}' on field {field}")]
    UnsupportedOperator { field: String, operator: String },

    #[error("Invalid value '{value}' for field {field}")]
    InvalidValue { field: String, value: String },

    #[error("Invalid sort key: {0}")]
    InvalidSort(String),
}
