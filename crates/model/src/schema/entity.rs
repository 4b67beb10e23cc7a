use crate::schema::relation::RelationDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logical property type, as declared by the host model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
    #[default]
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,

    /// Storage column; defaults to the property name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    #[serde(default, rename = "type")]
    pub property_type: PropertyType,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub id: bool,
}

impl PropertyDescriptor {
    pub fn new(name: &str, property_type: PropertyType) -> Self {
        PropertyDescriptor {
            name: name.to_string(),
            column: None,
            property_type,
            id: false,
        }
    }

    pub fn column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// Whether a filter without an explicit order gets sorted by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawIdSort", into = "RawIdSort")]
pub enum IdSortPolicy {
    #[default]
    Always,
    Never,
    NumericIdOnly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum IdSortMode {
    #[serde(rename = "numericIdOnly")]
    NumericIdOnly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum RawIdSort {
    Flag(bool),
    Mode(IdSortMode),
}

impl From<RawIdSort> for IdSortPolicy {
    fn from(raw: RawIdSort) -> Self {
        match raw {
            RawIdSort::Flag(true) => IdSortPolicy::Always,
            RawIdSort::Flag(false) => IdSortPolicy::Never,
            RawIdSort::Mode(IdSortMode::NumericIdOnly) => IdSortPolicy::NumericIdOnly,
        }
    }
}

impl From<IdSortPolicy> for RawIdSort {
    fn from(policy: IdSortPolicy) -> Self {
        match policy {
            IdSortPolicy::Always => RawIdSort::Flag(true),
            IdSortPolicy::Never => RawIdSort::Flag(false),
            IdSortPolicy::NumericIdOnly => RawIdSort::Mode(IdSortMode::NumericIdOnly),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySettings {
    /// Relations that may never be joined from this entity.
    #[serde(default)]
    pub hidden_relations: Vec<String>,

    #[serde(default)]
    pub default_id_sort: IdSortPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Optional database schema the table lives in, e.g. `public`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Declared properties, in declaration order.
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,

    #[serde(default)]
    pub relations: BTreeMap<String, RelationDescriptor>,

    #[serde(default)]
    pub settings: EntitySettings,
}

impl EntitySchema {
    pub fn new(name: &str) -> Self {
        EntitySchema {
            name: name.to_string(),
            table: None,
            schema: None,
            properties: Vec::new(),
            relations: BTreeMap::new(),
            settings: EntitySettings::default(),
        }
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }

    pub fn with_property(mut self, name: &str, property_type: PropertyType) -> Self {
        self.properties.push(PropertyDescriptor::new(name, property_type));
        self
    }

    pub fn with_column(mut self, name: &str, column: &str, property_type: PropertyType) -> Self {
        let mut property = PropertyDescriptor::new(name, property_type);
        property.column = Some(column.to_string());
        self.properties.push(property);
        self
    }

    pub fn with_id(mut self, name: &str, property_type: PropertyType) -> Self {
        let mut property = PropertyDescriptor::new(name, property_type);
        property.id = true;
        self.properties.push(property);
        self
    }

    pub fn with_relation(mut self, name: &str, relation: RelationDescriptor) -> Self {
        self.relations.insert(name.to_string(), relation);
        self
    }

    pub fn with_hidden_relation(mut self, name: &str) -> Self {
        self.settings.hidden_relations.push(name.to_string());
        self
    }

    pub fn with_default_id_sort(mut self, policy: IdSortPolicy) -> Self {
        self.settings.default_id_sort = policy;
        self
    }

    /// Table name, falling back to the lower-cased entity name.
    pub fn table_name(&self) -> String {
        self.table.clone().unwrap_or_else(|| self.name.to_lowercase())
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// Storage column for `property`, or the name itself when undeclared.
    pub fn column(&self, property: &str) -> String {
        self.property(property)
            .map(|p| p.column().to_string())
            .unwrap_or_else(|| property.to_string())
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.get(name)
    }

    pub fn id_names(&self) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|p| p.id)
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn has_only_numeric_ids(&self) -> bool {
        self.properties
            .iter()
            .filter(|p| p.id)
            .all(|p| p.property_type == PropertyType::Number)
    }

    pub fn is_hidden_relation(&self, name: &str) -> bool {
        self.settings.hidden_relations.iter().any(|r| r == name)
    }

    /// `Org` -> `org`, `OrgUser` -> `orgUser`; used for default foreign keys.
    pub fn camel_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}
