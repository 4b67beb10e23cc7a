use compiler::CompileError;
use thiserror::Error;

/// Errors raised while compiling or running a query.
#[derive(Debug, Error)]
pub enum DbError {
    /// Any Postgres driver error, passed through unchanged.
    #[error("SQL error: {0}")]
    Sql(#[from] tokio_postgres::Error),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// A binding could not be converted to the type Postgres prepared for it.
    #[error("Cannot bind parameter ${index} as {expected}: {value}")]
    Coercion {
        index: usize,
        expected: String,
        value: String,
    },

    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),
}

/// Errors happening during connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection string: {0}")]
    InvalidUrl(String),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("Postgres connection failed: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}
