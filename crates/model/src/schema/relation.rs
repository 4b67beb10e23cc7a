use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    HasManyThrough,
    ReferencesMany,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationKind::BelongsTo => "belongsTo",
            RelationKind::HasOne => "hasOne",
            RelationKind::HasMany => "hasMany",
            RelationKind::HasManyThrough => "hasManyThrough",
            RelationKind::ReferencesMany => "referencesMany",
        };
        f.write_str(name)
    }
}

/// Marks a relation whose target type is chosen per row by a discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polymorphic {
    /// Discriminator property on the parent side of the join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
}

/// Accepts `true`, `false` or `{ "discriminator": "..." }`.
fn deserialize_polymorphic<'de, D>(deserializer: D) -> Result<Option<Polymorphic>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Spec(Polymorphic),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Flag(true)) => Some(Polymorphic::default()),
        Some(Raw::Spec(spec)) => Some(spec),
        Some(Raw::Flag(false)) | None => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyedRelation {
    pub target: String,

    /// Key on the owning entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_from: Option<String>,

    /// Key on the target entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_to: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_polymorphic",
        skip_serializing_if = "Option::is_none"
    )]
    pub polymorphic: Option<Polymorphic>,
}

impl KeyedRelation {
    pub fn new(target: &str) -> Self {
        KeyedRelation {
            target: target.to_string(),
            key_from: None,
            key_to: None,
            polymorphic: None,
        }
    }

    pub fn key_from(mut self, key: &str) -> Self {
        self.key_from = Some(key.to_string());
        self
    }

    pub fn key_to(mut self, key: &str) -> Self {
        self.key_to = Some(key.to_string());
        self
    }

    pub fn polymorphic(mut self, discriminator: Option<&str>) -> Self {
        self.polymorphic = Some(Polymorphic {
            discriminator: discriminator.map(str::to_string),
        });
        self
    }
}

/// The join-table side of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Through {
    pub entity: String,

    /// Through-entity key referencing the owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_from: Option<String>,

    /// Through-entity key referencing the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_to: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_polymorphic",
        skip_serializing_if = "Option::is_none"
    )]
    pub polymorphic: Option<Polymorphic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughRelation {
    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_to: Option<String>,

    pub through: Through,
}

impl ThroughRelation {
    pub fn new(target: &str, through: &str) -> Self {
        ThroughRelation {
            target: target.to_string(),
            key_from: None,
            key_to: None,
            through: Through {
                entity: through.to_string(),
                key_from: None,
                key_to: None,
                polymorphic: None,
            },
        }
    }

    pub fn through_keys(mut self, key_from: &str, key_to: &str) -> Self {
        self.through.key_from = Some(key_from.to_string());
        self.through.key_to = Some(key_to.to_string());
        self
    }

    pub fn polymorphic(mut self, discriminator: Option<&str>) -> Self {
        self.through.polymorphic = Some(Polymorphic {
            discriminator: discriminator.map(str::to_string),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelationDescriptor {
    BelongsTo(KeyedRelation),
    HasOne(KeyedRelation),
    HasMany(KeyedRelation),
    HasManyThrough(ThroughRelation),
    /// Declared for completeness; it can never be joined.
    ReferencesMany(KeyedRelation),
}

impl RelationDescriptor {
    pub fn kind(&self) -> RelationKind {
        match self {
            RelationDescriptor::BelongsTo(_) => RelationKind::BelongsTo,
            RelationDescriptor::HasOne(_) => RelationKind::HasOne,
            RelationDescriptor::HasMany(_) => RelationKind::HasMany,
            RelationDescriptor::HasManyThrough(_) => RelationKind::HasManyThrough,
            RelationDescriptor::ReferencesMany(_) => RelationKind::ReferencesMany,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            RelationDescriptor::BelongsTo(r)
            | RelationDescriptor::HasOne(r)
            | RelationDescriptor::HasMany(r)
            | RelationDescriptor::ReferencesMany(r) => &r.target,
            RelationDescriptor::HasManyThrough(r) => &r.target,
        }
    }

    pub fn is_joinable(&self) -> bool {
        !matches!(self, RelationDescriptor::ReferencesMany(_))
    }

    pub fn is_polymorphic(&self) -> bool {
        match self {
            RelationDescriptor::BelongsTo(r)
            | RelationDescriptor::HasOne(r)
            | RelationDescriptor::HasMany(r)
            | RelationDescriptor::ReferencesMany(r) => r.polymorphic.is_some(),
            RelationDescriptor::HasManyThrough(r) => r.through.polymorphic.is_some(),
        }
    }
}

/// An equality the joined row must satisfy on its parent side,
/// e.g. `"delivery"."deliverableType" = 'Parcel'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminator {
    pub property: String,
    pub value: String,
}

/// One hop of a join with every key resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKeys {
    /// Entity joined by this hop.
    pub entity: String,
    /// Property on the parent side.
    pub key_from: String,
    /// Property on the joined side.
    pub key_to: String,
    pub discriminator: Option<Discriminator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRelation {
    Direct(JoinKeys),
    /// Owner -> through entity, then through entity -> target.
    Through { through: JoinKeys, target: JoinKeys },
}

impl ResolvedRelation {
    /// Entity reached at the end of the relation.
    pub fn target(&self) -> &str {
        match self {
            ResolvedRelation::Direct(keys) => &keys.entity,
            ResolvedRelation::Through { target, .. } => &target.entity,
        }
    }
}
