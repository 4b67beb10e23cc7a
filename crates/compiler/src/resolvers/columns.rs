use crate::utils::column;
use model::{filter::FieldsSpec, schema::EntitySchema};
use planner::query::ast::expr::Expr;
use serde_json::Value as JsonValue;

/// Property names selected by `fields`, or `None` for no restriction.
pub fn properties<'e>(entity: &'e EntitySchema, fields: Option<&FieldsSpec>) -> Option<Vec<&'e str>> {
    if entity.properties.is_empty() {
        return None;
    }
    let all = entity.properties.iter().map(|p| p.name.as_str());

    let selected = match fields {
        None => all.collect(),
        Some(FieldsSpec::List(names)) if names.is_empty() => all.collect(),
        Some(FieldsSpec::List(names)) => names
            .iter()
            .filter_map(|name| entity.property(name).map(|p| p.name.as_str()))
            .collect(),
        Some(FieldsSpec::Flags(flags)) => {
            let includes = all
                .clone()
                .filter(|name| flags.get(*name).is_some_and(is_truthy))
                .collect::<Vec<_>>();
            if includes.is_empty() {
                all.filter(|name| flags.get(*name).is_none_or(is_truthy))
                    .collect()
            } else {
                includes
            }
        }
    };
    Some(selected)
}

fn is_truthy(flag: &JsonValue) -> bool {
    match flag {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Projection for `entity`; empty means every column.
pub struct ColumnsCompiler<'a> {
    root: &'a EntitySchema,
}

impl<'a> ColumnsCompiler<'a> {
    pub fn new(root: &'a EntitySchema) -> Self {
        Self { root }
    }

    /// Table-qualified columns. Falls back to `"table".*` when joins are
    /// present and nothing is selected, so joined columns never leak in.
    pub fn compile(&self, fields: Option<&FieldsSpec>, has_joins: bool) -> Vec<Expr> {
        let table = self.root.table_name();
        let columns = properties(self.root, fields)
            .unwrap_or_default()
            .into_iter()
            .map(|name| column(Some(&table), self.root, name))
            .collect::<Vec<_>>();

        if columns.is_empty() && has_joins {
            return vec![Expr::Wildcard {
                qualifier: Some(table),
            }];
        }
        columns
    }
}
