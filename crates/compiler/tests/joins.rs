mod common;

use compiler::{
    CompileError,
    relation::join::JoinPlanner,
    session::{QuerySession, RelationConstraint},
    utils::entity_table,
};
use model::{core::value::Value, schema::SchemaError};
use planner::query::{builder::select::SelectBuilder, dialect::Postgres, renderer::render};
use serde_json::{Value as JsonValue, json};

fn try_plan(
    entity: &str,
    where_clause: JsonValue,
    order: &[&str],
) -> Result<(String, Vec<Value>, QuerySession), CompileError> {
    let registry = common::registry();
    let root = registry.entity(entity)?;
    let order = order.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let mut session = QuerySession::new();
    let planner = JoinPlanner::new(&registry, root);
    planner.plan(where_clause.as_object(), &order, &mut session)?;

    let mut builder = SelectBuilder::new()
        .select(vec![])
        .from(entity_table(root), None);
    for join in planner.join_clauses(&session)? {
        builder = builder.join(join.kind, join.table, join.alias.as_deref(), join.on);
    }
    let (sql, params) = render(&builder.build(), &Postgres);
    Ok((sql, params, session))
}

fn plan(entity: &str, where_clause: JsonValue) -> (String, Vec<Value>, QuerySession) {
    try_plan(entity, where_clause, &[]).unwrap()
}

fn constraint(prefix: &str, alias: &str, entity: &str, property: Option<&str>) -> RelationConstraint {
    RelationConstraint {
        prefix: prefix.to_string(),
        alias: alias.to_string(),
        entity: entity.to_string(),
        property: property.map(str::to_string),
    }
}

#[test]
fn test_empty_filter_plans_nothing() {
    let (sql, params, session) = plan("Foo", json!({}));
    assert_eq!(sql, r#"select * from "public"."foo""#);
    assert!(params.is_empty());
    assert!(!session.has_joins());
}

#[test]
fn test_plain_keys_plan_nothing() {
    let (sql, _, session) = plan("Foo", json!({"a": 1, "or": [{"b": 2}, {"name": "x"}]}));
    assert_eq!(sql, r#"select * from "public"."foo""#);
    assert!(session.where_constraints().is_empty());
}

#[test]
fn test_belongs_to_join() {
    let (sql, _, session) = plan("Issue", json!({"proj.name": "loopback"}));
    assert_eq!(
        sql,
        r#"select * from "public"."issue" left join "public"."proj" as "t_0_0_proj" on "issue"."projId" = "t_0_0_proj"."id""#
    );
    assert_eq!(
        session.where_constraint("proj.name"),
        Some(&constraint("t_0_0_", "t_0_0_proj", "Proj", Some("name")))
    );
}

#[test]
fn test_has_one_join() {
    let (sql, _, session) = plan("User", json!({"userInfo.info": "loopback"}));
    assert_eq!(
        sql,
        r#"select * from "public"."user" left join "public"."userinfo" as "t_0_0_userinfo" on "user"."id" = "t_0_0_userinfo"."userId""#
    );
    assert_eq!(
        session.where_constraint("userInfo.info"),
        Some(&constraint("t_0_0_", "t_0_0_userinfo", "UserInfo", Some("info")))
    );
}

#[test]
fn test_has_many_join() {
    let (sql, _, _) = plan("Proj", json!({"issues.title": "loopback"}));
    assert_eq!(
        sql,
        r#"select * from "public"."proj" left join "public"."issue" as "t_0_0_issue" on "proj"."id" = "t_0_0_issue"."projId""#
    );
}

#[test]
fn test_has_many_through_join() {
    let (sql, _, session) = plan("Org", json!({"users.email": {"ilike": "%@gmail.com"}}));
    assert_eq!(
        sql,
        r#"select * from "public"."org" left join "public"."orguser" as "t_0_0_orguser" on "org"."id" = "t_0_0_orguser"."orgId" left join "public"."user" as "t_0_0_user" on "t_0_0_orguser"."userId" = "t_0_0_user"."id""#
    );
    assert_eq!(session.joins().len(), 2);
    assert_eq!(
        session.where_constraint("users.email"),
        Some(&constraint("t_0_0_", "t_0_0_user", "User", Some("email")))
    );
}

#[test]
fn test_has_many_through_with_multiple_conditions() {
    let (sql, _, session) = plan(
        "Org",
        json!({"or": [
            {"users.email": {"ilike": "%@gmail.com"}},
            {"users.userInfo.info": {"ilike": "%abc%"}}
        ]}),
    );
    assert_eq!(
        sql,
        r#"select * from "public"."org" left join "public"."orguser" as "t_0_0_orguser" on "org"."id" = "t_0_0_orguser"."orgId" left join "public"."user" as "t_0_0_user" on "t_0_0_orguser"."userId" = "t_0_0_user"."id" left join "public"."userinfo" as "t_1_1_userinfo" on "t_0_0_user"."id" = "t_1_1_userinfo"."userId""#
    );
    assert_eq!(
        session.where_constraint("users.userInfo.info"),
        Some(&constraint("t_1_1_", "t_1_1_userinfo", "UserInfo", Some("info")))
    );
}

#[test]
fn test_deep_has_many_join() {
    let (sql, _, session) = plan("Org", json!({"projs.issues.title": {"like": "%x%"}}));
    assert_eq!(
        sql,
        r#"select * from "public"."org" left join "public"."proj" as "t_0_0_proj" on "org"."id" = "t_0_0_proj"."org_id" left join "public"."issue" as "t_1_1_issue" on "t_0_0_proj"."id" = "t_1_1_issue"."projId""#
    );
    assert_eq!(
        session.where_constraint("projs.issues.title"),
        Some(&constraint("t_1_1_", "t_1_1_issue", "Issue", Some("title")))
    );
}

#[test]
fn test_repeated_paths_share_joins() {
    let (sql, _, session) = plan(
        "Org",
        json!({"and": [
            {"projs.issues.closed": false},
            {"projs.issues.title": "a"},
            {"projs.issues.title": "b"}
        ]}),
    );
    assert_eq!(
        sql,
        r#"select * from "public"."org" left join "public"."proj" as "t_0_0_proj" on "org"."id" = "t_0_0_proj"."org_id" left join "public"."issue" as "t_1_1_issue" on "t_0_0_proj"."id" = "t_1_1_issue"."projId""#
    );
    assert_eq!(session.where_constraints().len(), 2);
    assert_eq!(session.current_seq(), 2);
}

#[test]
fn test_where_and_order_share_a_join() {
    let (_, _, session) = try_plan("Org", json!({"projs.name": "a"}), &["projs.name desc"]).unwrap();
    assert_eq!(session.joins().len(), 1);
    assert_eq!(
        session.where_constraint("projs.name").map(|c| &c.alias),
        session.order_constraint("projs.name").map(|c| &c.alias)
    );
}

#[test]
fn test_order_only_relation_is_planned() {
    let (sql, _, session) = try_plan("Issue", json!({}), &["proj.name"]).unwrap();
    assert!(sql.contains(r#"left join "public"."proj" as "t_0_0_proj""#));
    assert!(!session.has_relation_where());
    assert!(session.has_relation_order());
}

#[test]
fn test_join_into_json_property() {
    let (_, _, session) = plan("Org", json!({"users.address.city": "HK"}));
    assert_eq!(
        session.where_constraint("users.address.city"),
        Some(&constraint("t_0_0_", "t_0_0_user", "User", Some("address.city")))
    );
}

#[test]
fn test_join_directive_forces_relation() {
    let (sql, _, session) = plan("Org", json!({"$join": "projs"}));
    assert_eq!(
        sql,
        r#"select * from "public"."org" left join "public"."proj" as "t_0_0_proj" on "org"."id" = "t_0_0_proj"."org_id""#
    );
    assert_eq!(
        session.where_constraint("projs"),
        Some(&constraint("t_0_0_", "t_0_0_proj", "Proj", None))
    );
}

#[test]
fn test_expr_projections_are_planned() {
    let (sql, _, session) = plan("Bar", json!({"$expr": {"eq": ["$foo.a", "$foo.b"]}}));
    assert_eq!(
        sql,
        r#"select * from "public"."bar" left join "public"."foo" as "t_0_0_foo" on "bar"."fooId" = "t_0_0_foo"."id""#
    );
    assert_eq!(session.where_constraints().len(), 2);
}

#[test]
fn test_hidden_relation_is_skipped() {
    let (sql, _, session) = plan("Bird", json!({"foo.name": "x"}));
    assert_eq!(sql, r#"select * from "public"."bird""#);
    assert!(session.where_constraints().is_empty());
}

#[test]
fn test_references_many_is_skipped() {
    let (sql, _, session) = plan("Org", json!({"repos.name": "x"}));
    assert_eq!(sql, r#"select * from "public"."org""#);
    assert!(!session.has_relation_where());
}

#[test]
fn test_polymorphic_has_one() {
    let (sql, params, session) = plan("Delivery", json!({"deliverable(Parcel).parcelTitle": "parcel2"}));
    assert_eq!(
        sql,
        r#"select * from "public"."delivery" left join "public"."parcel" as "t_0_0_parcel" on "delivery"."id" = "t_0_0_parcel"."deliveryId" and "delivery"."deliverableType" = $1"#
    );
    assert_eq!(params, vec![Value::String("Parcel".into())]);
    assert_eq!(
        session.where_constraint("deliverable(Parcel).parcelTitle"),
        Some(&constraint("t_0_0_", "t_0_0_parcel", "Parcel", Some("parcelTitle")))
    );
}

#[test]
fn test_polymorphic_belongs_to() {
    let (sql, params, _) = plan("Transport", json!({"deliverable(Parcel).parcelTitle": "parcel2"}));
    assert_eq!(
        sql,
        r#"select * from "public"."transport" left join "public"."parcel" as "t_0_0_parcel" on "transport"."deliverableId" = "t_0_0_parcel"."id" and "transport"."deliverableType" = $1"#
    );
    assert_eq!(params, vec![Value::String("Parcel".into())]);
}

#[test]
fn test_polymorphic_has_many_through() {
    let (sql, params, _) = plan("Sender", json!({"deliverables(Parcel).parcelTitle": "parcel2"}));
    assert_eq!(
        sql,
        r#"select * from "public"."sender" left join "public"."senderdeliverable" as "t_0_0_senderdeliverable" on "sender"."id" = "t_0_0_senderdeliverable"."senderId" left join "public"."parcel" as "t_0_0_parcel" on "t_0_0_senderdeliverable"."deliverableId" = "t_0_0_parcel"."id" and "t_0_0_senderdeliverable"."deliverableType" = $1"#
    );
    assert_eq!(params, vec![Value::String("Parcel".into())]);
}

#[test]
fn test_distinct_tags_plan_distinct_joins() {
    let (_, params, session) = plan(
        "Delivery",
        json!({"or": [
            {"deliverable(Parcel).parcelTitle": "p"},
            {"deliverable(Letter).letterTitle": "l"}
        ]}),
    );
    let aliases = session
        .joins()
        .iter()
        .map(|j| j.alias.as_str())
        .collect::<Vec<_>>();
    assert_eq!(aliases, vec!["t_0_0_parcel", "t_1_0_letter"]);
    assert_eq!(
        params,
        vec![Value::String("Parcel".into()), Value::String("Letter".into())]
    );
}

#[test]
fn test_polymorphic_chain_without_property() {
    let (_, _, session) = plan("Delivery", json!({"$join": "deliverable(Parcel)"}));
    assert_eq!(
        session.where_constraint("deliverable(Parcel)"),
        Some(&constraint("t_0_0_", "t_0_0_parcel", "Parcel", None))
    );
}

#[test]
fn test_unknown_relation_is_fatal() {
    let result = try_plan("Org", json!({"nope.name": "x"}), &[]);
    assert!(matches!(result, Err(CompileError::UnknownPath { .. })));
}

#[test]
fn test_missing_property_on_target_is_fatal() {
    let result = try_plan("Org", json!({"projs.nope": "x"}), &[]);
    assert!(matches!(
        result,
        Err(CompileError::PropertyNotOnTarget { property, entity, .. })
            if property == "nope" && entity == "Proj"
    ));
}

#[test]
fn test_tag_on_plain_relation_is_fatal() {
    let result = try_plan("Org", json!({"projs(Issue).title": "x"}), &[]);
    assert!(matches!(result, Err(CompileError::InvalidPolymorphicUsage { .. })));
}

#[test]
fn test_unregistered_tag_is_fatal() {
    let result = try_plan("Delivery", json!({"deliverable(Box).title": "x"}), &[]);
    assert!(matches!(
        result,
        Err(CompileError::Schema(SchemaError::UnregisteredTarget { target, .. })) if target == "Box"
    ));
}

#[test]
fn test_unbalanced_parentheses_are_fatal() {
    let result = try_plan("Delivery", json!({"deliverable(Parcel.parcelTitle": "x"}), &[]);
    assert!(matches!(result, Err(CompileError::MalformedKey(_))));
}
