//! The declarative filter accepted by the compiler.
//!
//! ```json
//! {
//!   "where": {"projs.issues.title": {"like": "%x%"}, "or": [{"a": 5}, {"b": 6}]},
//!   "order": ["name desc", "id"],
//!   "limit": 10,
//!   "skip": 20,
//!   "fields": ["id", "name"]
//! }
//! ```
//!
//! The where tree is kept as raw JSON; its grammar (operators, groups and
//! directives) is interpreted by the compiler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

pub type Where = Map<String, JsonValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderSpec {
    One(String),
    Many(Vec<String>),
}

impl OrderSpec {
    /// Flattens the spec into `"key [asc|desc]"` entries.
    ///
    /// A comma either separates entries (`"a desc, b"`) or delimits the
    /// direction of the entry before it (`"name,desc"`).
    pub fn entries(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            OrderSpec::One(s) => vec![s.as_str()],
            OrderSpec::Many(items) => items.iter().map(String::as_str).collect(),
        };
        let mut entries = Vec::new();
        for source in raw {
            let mut current: Vec<String> = Vec::new();
            for piece in source.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match current.last_mut() {
                    Some(last) if is_direction(piece) && !last.contains(char::is_whitespace) => {
                        last.push(' ');
                        last.push_str(piece);
                    }
                    _ => current.push(piece.to_string()),
                }
            }
            entries.extend(current);
        }
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

fn is_direction(token: &str) -> bool {
    token.eq_ignore_ascii_case("asc") || token.eq_ignore_ascii_case("desc")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldsSpec {
    /// Explicit ordered projection.
    List(Vec<String>),
    /// Include/exclude flags keyed by property name.
    Flags(Map<String, JsonValue>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderSpec>,

    /// Kept loose: anything that is not a positive number means "unset".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<JsonValue>,

    /// Alias of `offset`; wins when both are present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldsSpec>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: JsonValue) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Wraps a bare where tree, as accepted by `count`.
    pub fn from_where(where_clause: JsonValue) -> Self {
        Filter {
            where_clause: Some(where_clause),
            ..Default::default()
        }
    }

    pub fn with_where(mut self, where_clause: JsonValue) -> Self {
        self.where_clause = Some(where_clause);
        self
    }

    pub fn with_order(mut self, entries: &[&str]) -> Self {
        self.order = Some(OrderSpec::Many(
            entries.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(JsonValue::from(limit));
        self
    }

    pub fn with_fields(mut self, fields: FieldsSpec) -> Self {
        self.fields = Some(fields);
        self
    }

    /// The where tree, if it is an object. Any other JSON shape is ignored.
    pub fn where_map(&self) -> Option<&Where> {
        self.where_clause.as_ref().and_then(JsonValue::as_object)
    }

    pub fn order_entries(&self) -> Vec<String> {
        self.order
            .as_ref()
            .map(OrderSpec::entries)
            .unwrap_or_default()
    }

    pub fn has_order(&self) -> bool {
        self.order.as_ref().is_some_and(|o| !o.is_empty())
    }
}
