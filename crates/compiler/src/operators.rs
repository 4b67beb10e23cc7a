//! Maps filter operator names onto the functions that compile them.

use crate::{error::CompileError, resolvers::where_clause::WhereCompiler};
use lazy_static::lazy_static;
use model::{core::value::Value, filter::Where};
use planner::query::ast::expr::{BinaryOperator, Expr};
use serde_json::Value as JsonValue;
use std::{collections::HashMap, sync::Arc};

/// A condition whose key has already been resolved to a column.
#[derive(Debug)]
pub struct Condition<'a> {
    pub operator: &'a str,
    /// Raw filter key; `None` at group level and under `$expr`.
    pub key: Option<&'a str>,
    /// Left-hand side. `None` for group operators.
    pub column: Option<Expr>,
    pub value: &'a JsonValue,
    /// Right-hand side of a `$expr` comparison, already resolved.
    pub operand: Option<Expr>,
}

impl Condition<'_> {
    fn take_column(&mut self) -> Result<Expr, CompileError> {
        self.column.take().ok_or_else(|| CompileError::InvalidOperand {
            operator: self.operator.to_string(),
            reason: "operator needs a property on its left-hand side".into(),
        })
    }

    fn reject_expr(&self) -> Result<(), CompileError> {
        if self.operand.is_some() {
            return Err(CompileError::InvalidExpression(format!(
                "'{}' cannot be used in $expr",
                self.operator
            )));
        }
        Ok(())
    }
}

pub type OperatorHandler =
    fn(&WhereCompiler<'_>, Condition<'_>) -> Result<Option<Expr>, CompileError>;

#[derive(Clone)]
pub struct OperatorRegistry {
    handlers: HashMap<String, OperatorHandler>,
}

lazy_static! {
    pub static ref DEFAULT_OPERATORS: Arc<OperatorRegistry> =
        Arc::new(OperatorRegistry::default());
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        let mut registry = OperatorRegistry::empty();
        registry.register("=", eq);
        registry.register("eq", eq);
        registry.register("!=", neq);
        registry.register("neq", neq);
        registry.register("<", lt);
        registry.register("lt", lt);
        registry.register("<=", lte);
        registry.register("lte", lte);
        registry.register(">", gt);
        registry.register("gt", gt);
        registry.register(">=", gte);
        registry.register("gte", gte);
        registry.register("in", in_list);
        registry.register("inq", in_list);
        registry.register("nin", not_in_list);
        registry.register("between", between);
        registry.register("like", like);
        registry.register("nlike", not_like);
        registry.register("ilike", ilike);
        registry.register("nilike", not_ilike);
        registry.register("not", not);
        registry.register("!", not);
        registry.register("and", and);
        registry.register("or", or);
        registry
    }
}

impl OperatorRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Adds or replaces the handler of `operator`.
    pub fn register(&mut self, operator: &str, handler: OperatorHandler) {
        self.handlers.insert(operator.to_string(), handler);
    }

    pub fn get(&self, operator: &str) -> Result<OperatorHandler, CompileError> {
        self.handlers
            .get(operator)
            .copied()
            .ok_or_else(|| CompileError::UnsupportedOperator(operator.to_string()))
    }

    pub fn contains(&self, operator: &str) -> bool {
        self.handlers.contains_key(operator)
    }

    pub fn operators(&self) -> Vec<&str> {
        let mut names = self.handlers.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.operators())
            .finish()
    }
}

pub fn bind(value: &JsonValue) -> Expr {
    Expr::Value(Value::from_json(value))
}

fn compare(mut condition: Condition<'_>, op: BinaryOperator) -> Result<Option<Expr>, CompileError> {
    let column = condition.take_column()?;
    let rhs = match condition.operand {
        Some(operand) => operand,
        None => bind(condition.value),
    };
    Ok(Some(Expr::binary(column, op, rhs)))
}

fn is_null(mut condition: Condition<'_>, negated: bool) -> Result<Option<Expr>, CompileError> {
    Ok(Some(Expr::IsNull {
        expr: Box::new(condition.take_column()?),
        negated,
    }))
}

fn eq(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    if condition.operand.is_none() && condition.value.is_null() {
        return is_null(condition, false);
    }
    compare(condition, BinaryOperator::Eq)
}

fn neq(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    if condition.operand.is_none() && condition.value.is_null() {
        return is_null(condition, true);
    }
    compare(condition, BinaryOperator::NotEq)
}

fn lt(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    compare(condition, BinaryOperator::Lt)
}

fn lte(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    compare(condition, BinaryOperator::LtEq)
}

fn gt(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    compare(condition, BinaryOperator::Gt)
}

fn gte(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    compare(condition, BinaryOperator::GtEq)
}

fn like(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    compare(condition, BinaryOperator::Like)
}

fn not_like(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    compare(condition, BinaryOperator::NotLike)
}

fn ilike(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    compare(condition, BinaryOperator::ILike)
}

fn not_ilike(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    compare(condition, BinaryOperator::NotILike)
}

/// Members of an `in`/`nin` list; an empty or missing list becomes `[null]`.
fn list_values(value: &JsonValue) -> Vec<Expr> {
    let list = match value {
        JsonValue::Array(items) => items.iter().map(bind).collect::<Vec<_>>(),
        JsonValue::Null => Vec::new(),
        scalar => vec![bind(scalar)],
    };
    if list.is_empty() {
        return vec![Expr::Value(Value::Null)];
    }
    list
}

fn membership(mut condition: Condition<'_>, negated: bool) -> Result<Option<Expr>, CompileError> {
    condition.reject_expr()?;
    Ok(Some(Expr::InList {
        expr: Box::new(condition.take_column()?),
        list: list_values(condition.value),
        negated,
    }))
}

fn in_list(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    membership(condition, false)
}

fn not_in_list(_: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    membership(condition, true)
}

fn between(_: &WhereCompiler<'_>, mut condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    condition.reject_expr()?;
    let value = condition.value;
    let JsonValue::Array(bounds) = value else {
        return Err(CompileError::InvalidOperand {
            operator: condition.operator.to_string(),
            reason: "expected an array of two bounds".into(),
        });
    };
    let bound = |i: usize| {
        bounds
            .get(i)
            .map(bind)
            .unwrap_or_else(|| Expr::Value(Value::Null))
    };
    Ok(Some(Expr::Between {
        expr: Box::new(condition.take_column()?),
        low: Box::new(bound(0)),
        high: Box::new(bound(1)),
    }))
}

fn not(compiler: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    condition.reject_expr()?;
    let inner = match (condition.key, condition.value) {
        // {"a": {"not": {"gt": 5}}} negates {"a": {"gt": 5}}
        (Some(key), value) => {
            let mut clause = Where::new();
            clause.insert(key.to_string(), value.clone());
            compiler.compile_clause(&clause)?
        }
        (None, JsonValue::Object(clause)) => compiler.compile_clause(clause)?,
        (None, JsonValue::Array(_)) => logical(compiler, condition.value, true)?,
        (None, _) => None,
    };
    Ok(inner.map(|expr| Expr::Not(Box::new(expr))))
}

fn and(compiler: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    condition.reject_expr()?;
    match condition.value {
        // A mapping is inlined into the current level.
        JsonValue::Object(clause) => compiler.compile_clause(clause),
        value => logical(compiler, value, true),
    }
}

fn or(compiler: &WhereCompiler<'_>, condition: Condition<'_>) -> Result<Option<Expr>, CompileError> {
    condition.reject_expr()?;
    logical(compiler, condition.value, false)
}

/// `((arm) and|or (arm))`. Arms that compile to nothing are left out.
fn logical(
    compiler: &WhereCompiler<'_>,
    value: &JsonValue,
    conjunctive: bool,
) -> Result<Option<Expr>, CompileError> {
    let clauses = match value {
        JsonValue::Array(clauses) => clauses
            .iter()
            .filter_map(JsonValue::as_object)
            .cloned()
            .collect::<Vec<_>>(),
        // One arm per pair.
        JsonValue::Object(clause) => clause
            .iter()
            .map(|(k, v)| {
                let mut arm = Where::new();
                arm.insert(k.clone(), v.clone());
                arm
            })
            .collect(),
        _ => return Ok(None),
    };

    let mut arms = Vec::with_capacity(clauses.len());
    for clause in &clauses {
        if let Some(arm) = compiler.compile_clause(clause)? {
            arms.push(arm.nested());
        }
    }
    if arms.is_empty() {
        return Ok(None);
    }

    let group = if conjunctive {
        Expr::And(arms)
    } else {
        Expr::Or(arms)
    };
    Ok(Some(group.nested()))
}
