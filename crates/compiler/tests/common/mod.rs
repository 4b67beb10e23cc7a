#![allow(dead_code)]

use compiler::{QueryCompiler, operators::DEFAULT_OPERATORS, relation::join::JoinPlanner};
use compiler::{resolvers::where_clause::WhereCompiler, session::QuerySession};
use model::{
    core::value::Value,
    schema::{
        EntitySchema, KeyedRelation, PropertyType, RelationDescriptor, SchemaRegistry,
        ThroughRelation,
    },
};
use planner::query::{dialect::Dialect, dialect::DialectKind, renderer::render};
use serde_json::Value as JsonValue;
use std::sync::Arc;

fn entity(name: &str) -> EntitySchema {
    EntitySchema::new(name)
        .with_schema("public")
        .with_id("id", PropertyType::Number)
}

pub fn registry() -> SchemaRegistry {
    let entities = vec![
        entity("Foo")
            .with_property("name", PropertyType::String)
            .with_property("a", PropertyType::Number)
            .with_property("b", PropertyType::Number)
            .with_property("c", PropertyType::Number)
            .with_relation("bars", RelationDescriptor::HasMany(KeyedRelation::new("Bar")))
            .with_relation("birds", RelationDescriptor::HasMany(KeyedRelation::new("Bird"))),
        entity("Bar")
            .with_property("name", PropertyType::String)
            .with_property("fooId", PropertyType::Number)
            .with_relation("foo", RelationDescriptor::BelongsTo(KeyedRelation::new("Foo"))),
        entity("Bird")
            .with_property("name", PropertyType::String)
            .with_property("fooId", PropertyType::Number)
            .with_relation("foo", RelationDescriptor::BelongsTo(KeyedRelation::new("Foo")))
            .with_hidden_relation("foo"),
        entity("Org")
            .with_property("name", PropertyType::String)
            .with_property("baseRepoRole", PropertyType::String)
            .with_column("billingAddress", "billing_address", PropertyType::String)
            .with_relation(
                "users",
                RelationDescriptor::HasManyThrough(ThroughRelation::new("User", "OrgUser")),
            )
            .with_relation(
                "projs",
                RelationDescriptor::HasMany(KeyedRelation::new("Proj").key_to("org_id")),
            )
            .with_relation(
                "repos",
                RelationDescriptor::ReferencesMany(KeyedRelation::new("Proj")),
            ),
        entity("OrgUser")
            .with_property("orgId", PropertyType::Number)
            .with_property("userId", PropertyType::Number),
        entity("User")
            .with_property("email", PropertyType::String)
            .with_property("address", PropertyType::Object)
            .with_relation(
                "userInfo",
                RelationDescriptor::HasOne(KeyedRelation::new("UserInfo")),
            )
            .with_relation(
                "orgs",
                RelationDescriptor::HasManyThrough(ThroughRelation::new("Org", "OrgUser")),
            ),
        entity("UserInfo")
            .with_property("userId", PropertyType::Number)
            .with_property("info", PropertyType::String)
            .with_property("a", PropertyType::Number)
            .with_property("b", PropertyType::Number),
        entity("Proj")
            .with_property("name", PropertyType::String)
            .with_property("title", PropertyType::String)
            .with_property("org_id", PropertyType::Number)
            .with_relation(
                "org",
                RelationDescriptor::BelongsTo(KeyedRelation::new("Org").key_from("org_id")),
            )
            .with_relation("issues", RelationDescriptor::HasMany(KeyedRelation::new("Issue"))),
        entity("Issue")
            .with_property("title", PropertyType::String)
            .with_property("closed", PropertyType::Boolean)
            .with_property("projId", PropertyType::Number)
            .with_property("creatorId", PropertyType::Number)
            .with_relation(
                "proj",
                RelationDescriptor::BelongsTo(KeyedRelation::new("Proj").key_from("projId")),
            )
            .with_relation(
                "creator",
                RelationDescriptor::BelongsTo(KeyedRelation::new("User").key_from("creatorId")),
            ),
        entity("Delivery")
            .with_property("deliverableType", PropertyType::String)
            .with_relation(
                "deliverable",
                RelationDescriptor::HasOne(KeyedRelation::new("Deliverable").polymorphic(None)),
            ),
        entity("Transport")
            .with_property("name", PropertyType::String)
            .with_property("deliverableId", PropertyType::Number)
            .with_property("deliverableType", PropertyType::String)
            .with_relation(
                "deliverable",
                RelationDescriptor::BelongsTo(
                    KeyedRelation::new("Deliverable")
                        .key_from("deliverableId")
                        .polymorphic(None),
                ),
            ),
        entity("Sender")
            .with_property("name", PropertyType::String)
            .with_relation(
                "deliverables",
                RelationDescriptor::HasManyThrough(
                    ThroughRelation::new("Deliverable", "SenderDeliverable").polymorphic(None),
                ),
            ),
        entity("SenderDeliverable")
            .with_property("deliverableType", PropertyType::String)
            .with_property("deliverableId", PropertyType::Number)
            .with_property("senderId", PropertyType::Number),
        entity("Deliverable")
            .with_property("address", PropertyType::String)
            .with_property("deliveryId", PropertyType::Number),
        entity("Parcel")
            .with_property("address", PropertyType::String)
            .with_property("deliveryId", PropertyType::Number)
            .with_property("parcelTitle", PropertyType::String),
        entity("Letter")
            .with_property("address", PropertyType::String)
            .with_property("deliveryId", PropertyType::Number)
            .with_property("letterTitle", PropertyType::String),
    ];

    let mut registry = SchemaRegistry::new();
    for entity in entities {
        registry.register(entity).expect("fixture entities are unique");
    }
    registry
}

pub fn compiler(dialect: DialectKind) -> QueryCompiler {
    QueryCompiler::new(Arc::new(registry())).with_dialect(dialect)
}

/// Plans `where_clause` on a fresh session and renders the predicate
/// alone, without the surrounding statement.
pub fn where_sql(
    entity: &str,
    where_clause: JsonValue,
    dialect: &dyn Dialect,
) -> (String, Vec<Value>) {
    let registry = registry();
    let root = registry.entity(entity).expect("fixture entity");
    let where_map = where_clause.as_object();

    let mut session = QuerySession::new();
    JoinPlanner::new(&registry, root)
        .plan(where_map, &[], &mut session)
        .expect("join plan");

    let expr = WhereCompiler::new(&registry, root, &session, &DEFAULT_OPERATORS)
        .compile(where_map)
        .expect("where clause");
    match expr {
        Some(expr) => render(&expr, dialect),
        None => (String::new(), Vec::new()),
    }
}
