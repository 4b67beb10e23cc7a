use crate::error::DbError;
use async_trait::async_trait;
use model::{core::value::Value, records::row::RowData};

/// Runs compiled SQL against a backend.
///
/// Rows come back keyed by column name; mapping to property names is left
/// to the caller, which knows the entity.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<RowData>, DbError>;
}
