use model::schema::SchemaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("No relation or property found for key '{key}' in entity '{entity}'")]
    UnknownPath { entity: String, key: String },

    #[error("'{property}' is not a property of '{entity}' reached through '{chain}'")]
    PropertyNotOnTarget {
        property: String,
        entity: String,
        chain: String,
    },

    #[error("Invalid polymorphic usage in key '{key}': {reason}")]
    InvalidPolymorphicUsage { key: String, reason: String },

    #[error("Malformed key '{0}'")]
    MalformedKey(String),

    #[error("Operator '{0}' is not supported")]
    UnsupportedOperator(String),

    #[error("Invalid $expr: {0}")]
    InvalidExpression(String),

    #[error("Invalid operand for '{operator}': {reason}")]
    InvalidOperand { operator: String, reason: String },

    #[error("Relation order constraint for key '{0}' is missing a property")]
    MissingOrderProperty(String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}
