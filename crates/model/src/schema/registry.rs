use crate::schema::{
    entity::EntitySchema,
    error::SchemaError,
    relation::{Discriminator, JoinKeys, Polymorphic, RelationDescriptor, ResolvedRelation},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path};
use tracing::debug;

/// On-disk form: `{ "entities": [ ... ] }`.
#[derive(Debug, Deserialize, Serialize)]
struct SchemaDocument {
    entities: Vec<EntitySchema>,
}

/// Read-only lookup of entity schemas by name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: EntitySchema) -> Result<(), SchemaError> {
        if self.entities.contains_key(&entity.name) {
            return Err(SchemaError::DuplicateEntity(entity.name));
        }
        debug!(entity = %entity.name, "Registered entity schema");
        self.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    /// Chaining form of [`SchemaRegistry::register`].
    pub fn with(mut self, entity: EntitySchema) -> Result<Self, SchemaError> {
        self.register(entity)?;
        Ok(self)
    }

    pub fn from_json(source: &str) -> Result<Self, SchemaError> {
        let document: SchemaDocument = serde_json::from_str(source)?;
        document
            .entities
            .into_iter()
            .try_fold(SchemaRegistry::new(), SchemaRegistry::with)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    pub fn to_json(&self) -> Result<String, SchemaError> {
        let mut entities = self.entities.values().cloned().collect::<Vec<_>>();
        entities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(serde_json::to_string_pretty(&SchemaDocument { entities })?)
    }

    pub fn entity(&self, name: &str) -> Result<&EntitySchema, SchemaError> {
        self.entities
            .get(name)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn entity_names(&self) -> Vec<&str> {
        let mut names = self.entities.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// Resolves every join key of `owner.name`, filling loopback-style
    /// defaults for the ones the declaration leaves out.
    ///
    /// `tag` is the polymorphic type picked by the filter path (the `Parcel`
    /// in `deliverable(Parcel)`); it replaces the declared target and adds a
    /// discriminator match on the parent side.
    pub fn resolve_relation(
        &self,
        owner: &EntitySchema,
        name: &str,
        tag: Option<&str>,
    ) -> Result<ResolvedRelation, SchemaError> {
        let relation = owner
            .relation(name)
            .ok_or_else(|| SchemaError::UnknownRelation {
                entity: owner.name.clone(),
                relation: name.to_string(),
            })?;

        let missing = |key: &'static str| SchemaError::MissingKey {
            entity: owner.name.clone(),
            relation: name.to_string(),
            key,
        };

        match relation {
            RelationDescriptor::BelongsTo(r) => {
                let target = self.target(owner, name, tag.unwrap_or(&r.target))?;
                let key_to = match &r.key_to {
                    Some(key) => key.clone(),
                    None => first_id(target).ok_or_else(|| missing("keyTo"))?,
                };
                Ok(ResolvedRelation::Direct(JoinKeys {
                    entity: target.name.clone(),
                    key_from: r.key_from.clone().unwrap_or_else(|| format!("{name}Id")),
                    key_to,
                    discriminator: discriminator(r.polymorphic.as_ref(), tag, || {
                        format!("{name}Type")
                    }),
                }))
            }
            RelationDescriptor::HasOne(r) | RelationDescriptor::HasMany(r) => {
                let target = self.target(owner, name, tag.unwrap_or(&r.target))?;
                let key_from = match &r.key_from {
                    Some(key) => key.clone(),
                    None => first_id(owner).ok_or_else(|| missing("keyFrom"))?,
                };
                Ok(ResolvedRelation::Direct(JoinKeys {
                    entity: target.name.clone(),
                    key_from,
                    key_to: r
                        .key_to
                        .clone()
                        .unwrap_or_else(|| format!("{}Id", owner.camel_name())),
                    discriminator: discriminator(r.polymorphic.as_ref(), tag, || {
                        format!("{name}Type")
                    }),
                }))
            }
            RelationDescriptor::HasManyThrough(r) => {
                let through = self.target(owner, name, &r.through.entity)?;
                let declared = self.target(owner, name, &r.target)?;
                let target = match tag {
                    Some(tag) => self.target(owner, name, tag)?,
                    None => declared,
                };

                let key_from = match &r.key_from {
                    Some(key) => key.clone(),
                    None => first_id(owner).ok_or_else(|| missing("keyFrom"))?,
                };
                let key_to = match &r.key_to {
                    Some(key) => key.clone(),
                    None => first_id(target).ok_or_else(|| missing("keyTo"))?,
                };

                Ok(ResolvedRelation::Through {
                    through: JoinKeys {
                        entity: through.name.clone(),
                        key_from,
                        key_to: r
                            .through
                            .key_from
                            .clone()
                            .unwrap_or_else(|| format!("{}Id", owner.camel_name())),
                        discriminator: None,
                    },
                    target: JoinKeys {
                        entity: target.name.clone(),
                        key_from: r
                            .through
                            .key_to
                            .clone()
                            .unwrap_or_else(|| format!("{}Id", declared.camel_name())),
                        key_to,
                        discriminator: discriminator(r.through.polymorphic.as_ref(), tag, || {
                            format!("{}Type", declared.camel_name())
                        }),
                    },
                })
            }
            RelationDescriptor::ReferencesMany(_) => Err(SchemaError::NotJoinable {
                entity: owner.name.clone(),
                relation: name.to_string(),
                kind: relation.kind().to_string(),
            }),
        }
    }

    fn target(
        &self,
        owner: &EntitySchema,
        relation: &str,
        target: &str,
    ) -> Result<&EntitySchema, SchemaError> {
        self.entities
            .get(target)
            .ok_or_else(|| SchemaError::UnregisteredTarget {
                entity: owner.name.clone(),
                relation: relation.to_string(),
                target: target.to_string(),
            })
    }
}

fn first_id(entity: &EntitySchema) -> Option<String> {
    entity.id_names().first().map(|id| id.to_string())
}

fn discriminator(
    polymorphic: Option<&Polymorphic>,
    tag: Option<&str>,
    default: impl FnOnce() -> String,
) -> Option<Discriminator> {
    let polymorphic = polymorphic?;
    let value = tag?;
    Some(Discriminator {
        property: polymorphic.discriminator.clone().unwrap_or_else(default),
        value: value.to_string(),
    })
}
