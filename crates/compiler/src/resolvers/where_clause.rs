//! Compiles a where tree into a predicate over the root table and the joins
//! the planner registered.

use crate::{
    error::CompileError,
    operators::{Condition, OperatorRegistry, bind},
    relation::join::{EXPR_DIRECTIVE, GROUP_OPERATORS, JOIN_DIRECTIVE, expr_operands},
    session::QuerySession,
    utils::{column, property_path},
};
use model::{
    filter::Where,
    schema::{EntitySchema, SchemaRegistry},
};
use planner::query::ast::expr::Expr;
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

pub struct WhereCompiler<'a> {
    registry: &'a SchemaRegistry,
    root: &'a EntitySchema,
    session: &'a QuerySession,
    operators: &'a OperatorRegistry,
}

impl<'a> WhereCompiler<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        root: &'a EntitySchema,
        session: &'a QuerySession,
        operators: &'a OperatorRegistry,
    ) -> Self {
        Self {
            registry,
            root,
            session,
            operators,
        }
    }

    pub fn compile(&self, where_clause: Option<&Where>) -> Result<Option<Expr>, CompileError> {
        match where_clause {
            Some(clause) => self.compile_clause(clause),
            None => Ok(None),
        }
    }

    /// Compiles one mapping level; its conditions are joined with `and`.
    pub fn compile_clause(&self, clause: &Where) -> Result<Option<Expr>, CompileError> {
        let mut conditions = Vec::new();

        for (key, value) in clause.iter().filter(|(_, v)| !is_blank(v)) {
            let key = key.as_str();
            if key == JOIN_DIRECTIVE {
                continue;
            }

            if GROUP_OPERATORS.contains(&key) {
                let handler = self.operators.get(key)?;
                let condition = Condition {
                    operator: key,
                    key: None,
                    column: None,
                    value,
                    operand: None,
                };
                conditions.extend(handler(self, condition)?);
            } else if key == EXPR_DIRECTIVE {
                conditions.extend(self.compile_expr(value)?);
            } else {
                let Some(column) = self.resolve_key(key)? else {
                    continue;
                };
                match value {
                    JsonValue::Object(operators) => {
                        for (operator, operand) in operators {
                            let handler = self.operators.get(operator)?;
                            let condition = Condition {
                                operator,
                                key: Some(key),
                                column: Some(column.clone()),
                                value: operand,
                                operand: None,
                            };
                            conditions.extend(handler(self, condition)?);
                        }
                    }
                    _ => {
                        let handler = self.operators.get("=")?;
                        let condition = Condition {
                            operator: "=",
                            key: Some(key),
                            column: Some(column),
                            value,
                            operand: None,
                        };
                        conditions.extend(handler(self, condition)?);
                    }
                }
            }
        }

        Ok(Expr::conjunction(conditions))
    }

    /// `{"$expr": {op: [lhs, rhs]}}`; `$`-prefixed operands are projections.
    fn compile_expr(&self, value: &JsonValue) -> Result<Option<Expr>, CompileError> {
        let (operator, [lhs, rhs]) = expr_operands(value)?;
        let (Some(left), Some(right)) = (self.expr_operand(lhs)?, self.expr_operand(rhs)?) else {
            debug!(?value, "Dropping $expr with an unresolvable projection");
            return Ok(None);
        };

        let handler = self.operators.get(operator)?;
        handler(
            self,
            Condition {
                operator,
                key: None,
                column: Some(left),
                value: rhs,
                operand: Some(right),
            },
        )
    }

    fn expr_operand(&self, operand: &JsonValue) -> Result<Option<Expr>, CompileError> {
        match operand.as_str().and_then(|s| s.strip_prefix('$')) {
            Some(projection) => self.resolve_key(projection),
            None => Ok(Some(bind(operand))),
        }
    }

    /// Column for a filter key, or `None` when the key should be dropped.
    pub fn resolve_key(&self, key: &str) -> Result<Option<Expr>, CompileError> {
        let root_table = self.root.table_name();
        // Any join makes bare root columns ambiguous, including order-only ones.
        let qualifier = (self.session.has_joins() || self.session.has_relation_where())
            .then_some(root_table.as_str());

        if self.root.has_property(key) {
            return Ok(Some(column(qualifier, self.root, key)));
        }

        let nested = key
            .split_once('.')
            .is_some_and(|(head, _)| self.root.has_property(head));
        if nested {
            return Ok(Some(property_path(qualifier, self.root, key)));
        }

        match self.session.where_constraint(key) {
            Some(constraint) => match &constraint.property {
                Some(property) => {
                    let entity = self.registry.entity(&constraint.entity)?;
                    trace!(key, alias = %constraint.alias, "Resolved relation key");
                    Ok(Some(property_path(Some(&constraint.alias), entity, property)))
                }
                None => {
                    debug!(key, "Ignoring relation key without a property");
                    Ok(None)
                }
            },
            None => {
                debug!(key, entity = %self.root.name, "Unknown key is skipped");
                Ok(None)
            }
        }
    }
}

/// Empty strings and empty arrays are treated as absent.
fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        _ => false,
    }
}
