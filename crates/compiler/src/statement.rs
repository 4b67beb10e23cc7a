//! Composes the join planner and the clause resolvers into complete statements.

use crate::{
    error::CompileError,
    operators::{DEFAULT_OPERATORS, OperatorRegistry},
    relation::join::JoinPlanner,
    resolvers::{
        columns::ColumnsCompiler, order::OrderCompiler, where_clause::WhereCompiler,
    },
    session::QuerySession,
    utils::{column, entity_table},
};
use model::{
    core::value::Value,
    filter::Filter,
    schema::{EntitySchema, IdSortPolicy, SchemaRegistry},
};
use planner::query::{
    ast::{
        expr::{Expr, FunctionCall},
        select::Select,
    },
    builder::select::SelectBuilder,
    dialect::DialectKind,
    renderer::render,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

pub const COUNT_ALIAS: &str = "cnt";
pub const COUNT_SUBQUERY_ALIAS: &str = "t_count";

/// SQL text with its positional bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct QueryCompiler {
    registry: Arc<SchemaRegistry>,
    dialect: DialectKind,
    operators: Arc<OperatorRegistry>,
}

impl QueryCompiler {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            dialect: DialectKind::default(),
            operators: Arc::clone(&DEFAULT_OPERATORS),
        }
    }

    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_operators(mut self, operators: Arc<OperatorRegistry>) -> Self {
        self.operators = operators;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn dialect(&self) -> DialectKind {
        self.dialect
    }

    /// Compiles the `select` of `entity` rows matching `filter`.
    pub fn select(&self, entity: &str, filter: &Filter) -> Result<CompiledQuery, CompileError> {
        let root = self.registry.entity(entity)?;
        let select = self.build_select(root, filter)?;
        Ok(self.finish(entity, &select))
    }

    /// Compiles `select count(*)` over the rows matching `where_clause`.
    pub fn count(
        &self,
        entity: &str,
        where_clause: Option<&JsonValue>,
    ) -> Result<CompiledQuery, CompileError> {
        let root = self.registry.entity(entity)?;
        let filter = match where_clause {
            Some(where_clause) => Filter::from_where(where_clause.clone()),
            None => Filter::new(),
        };
        let select = self.build_count(root, &filter)?;
        Ok(self.finish(entity, &select))
    }

    pub fn build_select(&self, root: &EntitySchema, filter: &Filter) -> Result<Select, CompileError> {
        let order = match filter.has_order() {
            true => filter.order_entries(),
            false => default_order(root),
        };

        let mut session = QuerySession::new();
        let planner = JoinPlanner::new(&self.registry, root);
        planner.plan(filter.where_map(), &order, &mut session)?;

        let where_expr = WhereCompiler::new(&self.registry, root, &session, &self.operators)
            .compile(filter.where_map())?;
        let order_by = OrderCompiler::new(&self.registry, root, &session).compile(&order)?;
        let columns =
            ColumnsCompiler::new(root).compile(filter.fields.as_ref(), session.has_joins());

        let mut builder = SelectBuilder::new()
            .select(columns)
            .from(entity_table(root), None);
        for join in planner.join_clauses(&session)? {
            builder = builder.join(join.kind, join.table, join.alias.as_deref(), join.on);
        }
        builder = builder.where_clause(where_expr);
        if session.has_joins() {
            builder = builder.group_by(id_columns(root));
        }
        for item in order_by {
            builder = builder.order_by(item.expr, item.direction);
        }
        if let Some(limit) = coerce_bound(filter.limit.as_ref()) {
            builder = builder.limit(Expr::Value(Value::Int(limit)));
        }
        if let Some(offset) = coerce_bound(filter.skip.as_ref().or(filter.offset.as_ref())) {
            builder = builder.offset(Expr::Value(Value::Int(offset)));
        }

        Ok(builder.build())
    }

    fn build_count(&self, root: &EntitySchema, filter: &Filter) -> Result<Select, CompileError> {
        let mut session = QuerySession::new();
        let planner = JoinPlanner::new(&self.registry, root);
        planner.plan(filter.where_map(), &[], &mut session)?;

        let where_expr = WhereCompiler::new(&self.registry, root, &session, &self.operators)
            .compile(filter.where_map())?;

        if !session.has_joins() {
            return Ok(SelectBuilder::new()
                .select(vec![count_star()])
                .from(entity_table(root), None)
                .where_clause(where_expr)
                .build());
        }

        // One row per root entity before counting.
        let ids = id_columns(root);
        let projection = match ids.is_empty() {
            true => vec![Expr::Wildcard {
                qualifier: Some(root.table_name()),
            }],
            false => ids.clone(),
        };
        let mut inner = SelectBuilder::new()
            .select(projection)
            .from(entity_table(root), None);
        for join in planner.join_clauses(&session)? {
            inner = inner.join(join.kind, join.table, join.alias.as_deref(), join.on);
        }
        let inner = inner.where_clause(where_expr).group_by(ids).build();

        Ok(SelectBuilder::new()
            .select(vec![count_star()])
            .from_subquery(inner, COUNT_SUBQUERY_ALIAS)
            .build())
    }

    fn finish(&self, entity: &str, select: &Select) -> CompiledQuery {
        let (sql, bindings) = render(select, self.dialect.dialect());
        debug!(entity, sql = %sql, ?bindings, "Compiled statement");
        CompiledQuery { sql, bindings }
    }
}

/// Id ordering applied when a filter gives none, subject to the entity policy.
fn default_order(root: &EntitySchema) -> Vec<String> {
    let applies = match root.settings.default_id_sort {
        IdSortPolicy::Always => true,
        IdSortPolicy::Never => false,
        IdSortPolicy::NumericIdOnly => root.has_only_numeric_ids(),
    };
    if !applies {
        return Vec::new();
    }
    root.id_names().into_iter().map(str::to_string).collect()
}

fn id_columns(root: &EntitySchema) -> Vec<Expr> {
    let table = root.table_name();
    root.id_names()
        .into_iter()
        .map(|id| column(Some(&table), root, id))
        .collect()
}

fn count_star() -> Expr {
    Expr::Alias {
        expr: Box::new(Expr::FunctionCall(FunctionCall {
            name: "count".to_string(),
            args: vec![],
            wildcard: true,
        })),
        alias: COUNT_ALIAS.to_string(),
    }
}

/// `limit`/`offset` as a positive integer; numeric strings are accepted,
/// anything else (including `NaN` and `0`) is treated as unset.
fn coerce_bound(value: Option<&JsonValue>) -> Option<i64> {
    let number = match value? {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() || number < 1.0 {
        return None;
    }
    Some(number.trunc() as i64)
}
