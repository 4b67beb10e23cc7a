use crate::{error::DbError, executor::QueryExecutor};
use compiler::{CompileError, QueryCompiler, statement::COUNT_ALIAS};
use model::{
    filter::Filter,
    records::row::{FieldValue, RowData},
    schema::EntitySchema,
};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Compiles filters for one entity and runs them through an executor.
pub struct EntityQuery<E> {
    compiler: QueryCompiler,
    executor: E,
    entity: String,
}

impl<E: QueryExecutor> EntityQuery<E> {
    pub fn new(compiler: QueryCompiler, executor: E, entity: &str) -> Result<Self, DbError> {
        compiler
            .registry()
            .entity(entity)
            .map_err(CompileError::from)?;
        Ok(EntityQuery {
            compiler,
            executor,
            entity: entity.to_string(),
        })
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Rows matching `filter`, keyed by property name.
    pub async fn find(&self, filter: &Filter) -> Result<Vec<RowData>, DbError> {
        let query = self.compiler.select(&self.entity, filter)?;
        let rows = self.executor.query(&query.sql, &query.bindings).await?;
        debug!(entity = %self.entity, rows = rows.len(), "Fetched rows");

        let root = self.root()?;
        Ok(rows.into_iter().map(|row| to_properties(root, row)).collect())
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<RowData>, DbError> {
        let filter = filter.clone().with_limit(1);
        Ok(self.find(&filter).await?.into_iter().next())
    }

    pub async fn count(&self, where_clause: Option<&JsonValue>) -> Result<u64, DbError> {
        let query = self.compiler.count(&self.entity, where_clause)?;
        let rows = self.executor.query(&query.sql, &query.bindings).await?;

        let count = rows
            .first()
            .and_then(|row| row.get(COUNT_ALIAS))
            .and_then(|field| field.value.as_i64())
            .and_then(|count| u64::try_from(count).ok())
            .ok_or_else(|| {
                DbError::UnexpectedResult(format!(
                    "count of \"{}\" returned no \"{COUNT_ALIAS}\" column",
                    self.entity
                ))
            })?;
        debug!(entity = %self.entity, count, "Counted rows");
        Ok(count)
    }

    fn root(&self) -> Result<&EntitySchema, DbError> {
        let root = self
            .compiler
            .registry()
            .entity(&self.entity)
            .map_err(CompileError::from)?;
        Ok(root)
    }
}

/// Renames storage columns back to the property names declared on `root`.
/// Columns with no matching property keep their name.
fn to_properties(root: &EntitySchema, row: RowData) -> RowData {
    let field_values = row
        .field_values
        .into_iter()
        .map(|field| {
            let name = root
                .properties
                .iter()
                .find(|p| p.column() == field.name)
                .map_or(field.name, |p| p.name.clone());
            FieldValue {
                name,
                value: field.value,
            }
        })
        .collect();
    RowData::new(&root.name, field_values)
}
