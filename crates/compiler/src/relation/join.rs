//! Grows the join plan of a [`QuerySession`] from the relation-bearing keys of
//! a filter and renders it as `left join` clauses.

use crate::{
    error::CompileError,
    relation::chain::{ChainResolution, PathSegment, resolve_chain},
    session::{ConstraintScope, QuerySession, RelationConstraint, RelationJoin},
    utils::{column, entity_table},
};
use model::{
    core::value::Value,
    filter::Where,
    schema::{EntitySchema, JoinKeys, ResolvedRelation, SchemaRegistry},
};
use planner::query::ast::{
    common::JoinKind,
    expr::{BinaryOperator, Expr},
    select::JoinClause,
};
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

pub const GROUP_OPERATORS: [&str; 4] = ["and", "or", "not", "!"];
pub const EXPR_DIRECTIVE: &str = "$expr";
pub const JOIN_DIRECTIVE: &str = "$join";

/// A key referenced by a where tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterKey {
    pub key: String,
    /// Listed under `$join`: always resolved, even when it looks plain.
    pub forced: bool,
}

/// Collects the keys of a where tree in first-seen order.
pub fn extract_keys(where_clause: &Where) -> Result<Vec<FilterKey>, CompileError> {
    let mut keys = Vec::new();
    collect_keys(where_clause, &mut keys)?;
    Ok(keys)
}

fn collect_keys(where_clause: &Where, keys: &mut Vec<FilterKey>) -> Result<(), CompileError> {
    for (key, value) in where_clause {
        if GROUP_OPERATORS.contains(&key.as_str()) {
            match value {
                JsonValue::Array(clauses) => {
                    for clause in clauses.iter().filter_map(JsonValue::as_object) {
                        collect_keys(clause, keys)?;
                    }
                }
                JsonValue::Object(clause) => collect_keys(clause, keys)?,
                _ => {}
            }
        } else if key == EXPR_DIRECTIVE {
            let (_, operands) = expr_operands(value)?;
            for operand in operands {
                if let Some(projection) = operand.as_str().and_then(|s| s.strip_prefix('$')) {
                    add_key(keys, projection, false);
                }
            }
        } else if key == JOIN_DIRECTIVE {
            for path in join_paths(value)? {
                add_key(keys, path, true);
            }
        } else {
            add_key(keys, key, false);
        }
    }
    Ok(())
}

fn add_key(keys: &mut Vec<FilterKey>, key: &str, forced: bool) {
    match keys.iter_mut().find(|k| k.key == key) {
        Some(existing) => existing.forced |= forced,
        None => keys.push(FilterKey {
            key: key.to_string(),
            forced,
        }),
    }
}

/// Splits `{op: [lhs, rhs]}` into its operator and two operands.
pub fn expr_operands(value: &JsonValue) -> Result<(&str, [&JsonValue; 2]), CompileError> {
    let expr = value
        .as_object()
        .ok_or_else(|| CompileError::InvalidExpression("$expr must be an object".into()))?;
    let (op, operands) = expr
        .iter()
        .next()
        .ok_or_else(|| CompileError::InvalidExpression("$expr has no operator".into()))?;
    match operands.as_array().map(Vec::as_slice) {
        Some([lhs, rhs]) => Ok((op.as_str(), [lhs, rhs])),
        _ => Err(CompileError::InvalidExpression(format!(
            "$expr->{op} must be an array value with 2 elements"
        ))),
    }
}

fn join_paths(value: &JsonValue) -> Result<Vec<&str>, CompileError> {
    let invalid = || CompileError::InvalidOperand {
        operator: JOIN_DIRECTIVE.into(),
        reason: "expected a relation path or a list of paths".into(),
    };
    match value {
        JsonValue::String(path) => Ok(vec![path.as_str()]),
        JsonValue::Array(paths) => paths
            .iter()
            .map(|p| p.as_str().ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}

/// Leading token of an order entry: `"a.b desc"` -> `"a.b"`.
pub fn order_key(entry: &str) -> &str {
    entry
        .split(|c: char| c.is_whitespace() || c == ',')
        .find(|s| !s.is_empty())
        .unwrap_or(entry)
}

/// The parent end of the hop being planned.
struct Anchor {
    path: String,
    prefix: String,
    alias: String,
    entity: String,
}

pub struct JoinPlanner<'a> {
    registry: &'a SchemaRegistry,
    root: &'a EntitySchema,
}

impl<'a> JoinPlanner<'a> {
    pub fn new(registry: &'a SchemaRegistry, root: &'a EntitySchema) -> Self {
        Self { registry, root }
    }

    /// Plans the joins of every relation-bearing key of `where_clause` and
    /// of every `order` entry.
    pub fn plan(
        &self,
        where_clause: Option<&Where>,
        order: &[String],
        session: &mut QuerySession,
    ) -> Result<(), CompileError> {
        if let Some(where_clause) = where_clause {
            let keys = extract_keys(where_clause)?;
            debug!(entity = %self.root.name, ?keys, "Extracted where keys");
            for key in &keys {
                if key.forced || self.is_relation_bearing(&key.key) {
                    self.compile(&key.key, session, ConstraintScope::Where)?;
                }
            }
        }

        for entry in order {
            let key = order_key(entry);
            if self.is_relation_bearing(key) {
                self.compile(key, session, ConstraintScope::Order)?;
            }
        }

        Ok(())
    }

    fn is_relation_bearing(&self, key: &str) -> bool {
        if key.contains('.') || key.contains('(') {
            return true;
        }
        self.root.relation(key).is_some()
    }

    /// Resolves `key` and records its joins and constraint.
    pub fn compile(
        &self,
        key: &str,
        session: &mut QuerySession,
        scope: ConstraintScope,
    ) -> Result<(), CompileError> {
        let (chain, property) = match resolve_chain(self.registry, self.root, key)? {
            ChainResolution::Plain => {
                trace!(key, "Plain key, no join needed");
                return Ok(());
            }
            ChainResolution::Relations(chain) => (chain, None),
            ChainResolution::Property {
                chain,
                property_key,
                ..
            } => (chain, Some(property_key)),
        };

        let Some(hops) = self.resolve_hops(key, &chain)? else {
            return Ok(());
        };

        let mut anchor = Anchor {
            path: self.root.name.clone(),
            prefix: String::new(),
            alias: self.root.table_name(),
            entity: self.root.name.clone(),
        };

        for (depth, (segment, resolved)) in chain.iter().zip(hops).enumerate() {
            let path = format!("{}.{segment}", anchor.path);
            if session.find_join(&path).is_none() {
                let prefix = format!("t_{}_{depth}_", session.next_seq());
                self.add_joins(session, &anchor, &path, &prefix, segment, resolved)?;
            } else {
                trace!(path = %path, "Reusing join");
            }
            let join = session
                .find_join(&path)
                .ok_or_else(|| CompileError::UnknownPath {
                    entity: self.root.name.clone(),
                    key: key.to_string(),
                })?;
            anchor = Anchor {
                path,
                prefix: join.prefix.clone(),
                alias: join.alias.clone(),
                entity: join.target_entity.clone(),
            };
        }

        debug!(key, alias = %anchor.alias, ?scope, "Registered relation constraint");
        session.set_constraint(
            scope,
            key,
            RelationConstraint {
                prefix: anchor.prefix,
                alias: anchor.alias,
                entity: anchor.entity,
                property,
            },
        );
        Ok(())
    }

    /// Resolves the keys of every hop, or `None` when the chain crosses a
    /// hidden or non-joinable relation. Nothing is planned in that case.
    fn resolve_hops(
        &self,
        key: &str,
        chain: &[PathSegment],
    ) -> Result<Option<Vec<ResolvedRelation>>, CompileError> {
        let mut owner = self.root;
        let mut hops = Vec::with_capacity(chain.len());

        for segment in chain {
            if owner.is_hidden_relation(&segment.name) {
                debug!(key, entity = %owner.name, relation = %segment.name, "Skipping hidden relation");
                return Ok(None);
            }
            let joinable = owner
                .relation(&segment.name)
                .is_some_and(|relation| relation.is_joinable());
            if !joinable {
                debug!(key, entity = %owner.name, relation = %segment.name, "Skipping relation that cannot be joined");
                return Ok(None);
            }

            let resolved =
                self.registry
                    .resolve_relation(owner, &segment.name, segment.tag.as_deref())?;
            owner = self.registry.entity(resolved.target())?;
            hops.push(resolved);
        }

        Ok(Some(hops))
    }

    fn add_joins(
        &self,
        session: &mut QuerySession,
        anchor: &Anchor,
        path: &str,
        prefix: &str,
        segment: &PathSegment,
        resolved: ResolvedRelation,
    ) -> Result<(), CompileError> {
        match resolved {
            ResolvedRelation::Direct(keys) => {
                let join = self.relation_join(anchor, path, prefix, &segment.name, keys)?;
                debug!(path, alias = %join.alias, "Planned join");
                session.add_join(join);
            }
            ResolvedRelation::Through { through, target } => {
                let through_path = format!("{}.-.{segment}", anchor.path);
                let through_join = self.relation_join(
                    anchor,
                    &through_path,
                    prefix,
                    &format!("_{}_", segment.name),
                    through,
                )?;
                let through_anchor = Anchor {
                    path: through_path,
                    prefix: prefix.to_string(),
                    alias: through_join.alias.clone(),
                    entity: through_join.target_entity.clone(),
                };
                let target_join =
                    self.relation_join(&through_anchor, path, prefix, &segment.name, target)?;
                debug!(
                    path,
                    through = %through_join.alias,
                    alias = %target_join.alias,
                    "Planned through join"
                );
                session.add_join(through_join);
                session.add_join(target_join);
            }
        }
        Ok(())
    }

    fn relation_join(
        &self,
        anchor: &Anchor,
        path: &str,
        prefix: &str,
        relation: &str,
        keys: JoinKeys,
    ) -> Result<RelationJoin, CompileError> {
        let target = self.registry.entity(&keys.entity)?;
        Ok(RelationJoin {
            relation_path: path.to_string(),
            prefix: prefix.to_string(),
            parent_prefix: anchor.prefix.clone(),
            parent_alias: anchor.alias.clone(),
            parent_entity: anchor.entity.clone(),
            relation: relation.to_string(),
            key_from: keys.key_from,
            key_to: keys.key_to,
            target_entity: keys.entity,
            alias: format!("{prefix}{}", target.table_name()),
            discriminator: keys.discriminator,
        })
    }

    /// Renders the planned joins in planning order.
    pub fn join_clauses(&self, session: &QuerySession) -> Result<Vec<JoinClause>, CompileError> {
        session
            .joins()
            .iter()
            .map(|join| self.join_clause(join))
            .collect()
    }

    fn join_clause(&self, join: &RelationJoin) -> Result<JoinClause, CompileError> {
        let parent = self.registry.entity(&join.parent_entity)?;
        let target = self.registry.entity(&join.target_entity)?;

        let mut on = vec![Expr::binary(
            column(Some(&join.parent_alias), parent, &join.key_from),
            BinaryOperator::Eq,
            column(Some(&join.alias), target, &join.key_to),
        )];
        if let Some(discriminator) = &join.discriminator {
            on.push(Expr::binary(
                column(Some(&join.parent_alias), parent, &discriminator.property),
                BinaryOperator::Eq,
                Expr::Value(Value::String(discriminator.value.clone())),
            ));
        }

        Ok(JoinClause {
            kind: JoinKind::Left,
            table: entity_table(target),
            alias: Some(join.alias.clone()),
            on: Expr::And(on),
        })
    }
}
