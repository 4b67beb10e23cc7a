//! Per-compilation state shared by the join planner and the clause resolvers.

use model::schema::Discriminator;
use std::collections::HashMap;

/// One `left join` of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationJoin {
    /// Root entity name followed by the relation segments, e.g. `Org.projs.issues`.
    pub relation_path: String,
    /// `t_{seq}_{depth}_`
    pub prefix: String,
    /// Empty when the parent is the root table.
    pub parent_prefix: String,
    pub parent_alias: String,
    pub parent_entity: String,
    pub relation: String,
    /// Property of the parent entity.
    pub key_from: String,
    /// Property of the joined entity.
    pub key_to: String,
    pub target_entity: String,
    /// `prefix + target table`
    pub alias: String,
    pub discriminator: Option<Discriminator>,
}

/// Where a relation-qualified filter key points once its joins exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationConstraint {
    pub prefix: String,
    pub alias: String,
    pub entity: String,
    /// Trailing property path; `None` when the key stops at a relation.
    pub property: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintScope {
    Where,
    Order,
}

#[derive(Debug, Default)]
pub struct QuerySession {
    seq: usize,
    joins: Vec<RelationJoin>,
    relation_where: HashMap<String, RelationConstraint>,
    relation_order: HashMap<String, RelationConstraint>,
}

impl QuerySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_seq(&self) -> usize {
        self.seq
    }

    /// Returns the current sequence number and advances it.
    pub fn next_seq(&mut self) -> usize {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    pub fn joins(&self) -> &[RelationJoin] {
        &self.joins
    }

    pub fn has_joins(&self) -> bool {
        !self.joins.is_empty()
    }

    pub fn find_join(&self, relation_path: &str) -> Option<&RelationJoin> {
        self.joins.iter().find(|j| j.relation_path == relation_path)
    }

    pub fn add_join(&mut self, join: RelationJoin) {
        self.joins.push(join);
    }

    pub fn set_constraint(
        &mut self,
        scope: ConstraintScope,
        key: &str,
        constraint: RelationConstraint,
    ) {
        let constraints = match scope {
            ConstraintScope::Where => &mut self.relation_where,
            ConstraintScope::Order => &mut self.relation_order,
        };
        constraints.insert(key.to_string(), constraint);
    }

    pub fn where_constraint(&self, key: &str) -> Option<&RelationConstraint> {
        self.relation_where.get(key)
    }

    pub fn order_constraint(&self, key: &str) -> Option<&RelationConstraint> {
        self.relation_order.get(key)
    }

    pub fn has_relation_where(&self) -> bool {
        !self.relation_where.is_empty()
    }

    pub fn has_relation_order(&self) -> bool {
        !self.relation_order.is_empty()
    }

    pub fn where_constraints(&self) -> &HashMap<String, RelationConstraint> {
        &self.relation_where
    }

    pub fn order_constraints(&self) -> &HashMap<String, RelationConstraint> {
        &self.relation_order
    }
}
