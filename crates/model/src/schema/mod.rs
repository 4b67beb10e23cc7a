//! Entity metadata consumed by the query compiler.
//!
//! A [`registry::SchemaRegistry`] is built once (either through the builder
//! API on [`entity::EntitySchema`] or from a JSON document) and shared
//! read-only by every compilation.

pub mod entity;
pub mod error;
pub mod registry;
pub mod relation;

pub use entity::{EntitySchema, EntitySettings, IdSortPolicy, PropertyDescriptor, PropertyType};
pub use error::SchemaError;
pub use registry::SchemaRegistry;
pub use relation::{
    Discriminator, JoinKeys, KeyedRelation, Polymorphic, RelationDescriptor, RelationKind,
    ResolvedRelation, Through, ThroughRelation,
};
