use compiler::CompileError;
use connectors::{ConnectorError, DbError};
use model::schema::SchemaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read the filter file: {0}")]
    FilterFileRead(#[from] std::io::Error),

    #[error("Invalid filter JSON: {0}")]
    FilterParse(#[from] serde_json::Error),

    #[error("Failed to load the schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Failed to compile the filter: {0}")]
    Compile(#[from] CompileError),

    #[error("Query failed: {0}")]
    Database(#[from] DbError),

    #[error("Connection failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),
}
