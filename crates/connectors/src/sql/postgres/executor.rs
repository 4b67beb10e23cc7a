use crate::{
    error::{ConnectorError, DbError},
    executor::QueryExecutor,
    sql::postgres::{params::PgParamStore, row::to_row_data, utils::connect_client},
};
use async_trait::async_trait;
use model::{core::value::Value, records::row::RowData};
use std::sync::Arc;
use tokio_postgres::Client;
use tracing::debug;

/// Executes statements rendered with the Postgres dialect.
#[derive(Clone)]
pub struct PgExecutor {
    client: Arc<Client>,
}

impl PgExecutor {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = connect_client(url).await?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        PgExecutor {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<RowData>, DbError> {
        // Prepare first so the bindings can be coerced to the inferred types.
        let statement = self.client.prepare(sql).await?;
        let bindings = PgParamStore::coerce(params, statement.params())?;

        let rows = self.client.query(&statement, &bindings.as_refs()).await?;
        debug!(rows = rows.len(), "Postgres query returned");

        Ok(rows.iter().map(to_row_data).collect())
    }
}
