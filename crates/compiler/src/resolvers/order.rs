use crate::{error::CompileError, session::QuerySession, utils::property_path};
use model::schema::{EntitySchema, SchemaRegistry};
use planner::query::ast::{common::OrderDir, expr::Expr, select::OrderByExpr};
use tracing::trace;

/// Compiles `"key [asc|desc]"` entries into `order by` items.
pub struct OrderCompiler<'a> {
    registry: &'a SchemaRegistry,
    root: &'a EntitySchema,
    session: &'a QuerySession,
}

impl<'a> OrderCompiler<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        root: &'a EntitySchema,
        session: &'a QuerySession,
    ) -> Self {
        Self {
            registry,
            root,
            session,
        }
    }

    pub fn compile(&self, entries: &[String]) -> Result<Vec<OrderByExpr>, CompileError> {
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut tokens = entry
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty());
            let Some(key) = tokens.next() else {
                continue;
            };
            let direction = OrderDir::parse(tokens.next());
            items.push(OrderByExpr {
                expr: self.resolve(key)?,
                direction: Some(direction),
            });
        }
        Ok(items)
    }

    fn resolve(&self, key: &str) -> Result<Expr, CompileError> {
        match self.session.order_constraint(key) {
            Some(constraint) => {
                let property = constraint
                    .property
                    .as_deref()
                    .ok_or_else(|| CompileError::MissingOrderProperty(key.to_string()))?;
                let entity = self.registry.entity(&constraint.entity)?;
                trace!(key, alias = %constraint.alias, "Ordering by relation column");
                Ok(property_path(Some(&constraint.alias), entity, property))
            }
            None => {
                let table = self.root.table_name();
                Ok(property_path(Some(&table), self.root, key))
            }
        }
    }
}
