use model::schema::EntitySchema;
use planner::{
    ident,
    query::ast::{common::TableRef, expr::Expr},
    table_ref,
};

/// Table of `entity`, schema-qualified when it declares one.
pub fn entity_table(entity: &EntitySchema) -> TableRef {
    match &entity.schema {
        Some(schema) => table_ref!(schema, entity.table_name()),
        None => table_ref!(entity.table_name()),
    }
}

/// Column of `property`, optionally qualified by a table name or join alias.
pub fn column(qualifier: Option<&str>, entity: &EntitySchema, property: &str) -> Expr {
    let column = entity.column(property);
    match qualifier {
        Some(qualifier) => Expr::Identifier(ident!(qualifier, column)),
        None => Expr::Identifier(ident!(column)),
    }
}

/// Like [`column`], but a dotted key whose head is a property addresses into
/// that property's JSON value: `address.city` -> `"address"->>'city'`.
pub fn property_path(qualifier: Option<&str>, entity: &EntitySchema, key: &str) -> Expr {
    if entity.has_property(key) {
        return column(qualifier, entity, key);
    }
    let mut segments = key.split('.');
    let head = segments.next().unwrap_or(key);
    let path = segments.map(str::to_string).collect::<Vec<_>>();
    if path.is_empty() {
        return column(qualifier, entity, key);
    }

    let column = entity.column(head);
    Expr::JsonPath {
        column: match qualifier {
            Some(qualifier) => ident!(qualifier, column),
            None => ident!(column),
        },
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::schema::PropertyType;
    use planner::query::{dialect::Postgres, renderer::render};

    fn user() -> EntitySchema {
        EntitySchema::new("User")
            .with_schema("public")
            .with_id("id", PropertyType::Number)
            .with_column("zip", "zip_code", PropertyType::String)
            .with_property("address", PropertyType::Object)
    }

    fn sql(expr: &Expr) -> String {
        render(expr, &Postgres).0
    }

    #[test]
    fn test_entity_table_with_schema() {
        let user = user();
        assert_eq!(entity_table(&user), table_ref!("public", "user"));
    }

    #[test]
    fn test_column_uses_storage_name() {
        let user = user();
        assert_eq!(sql(&column(Some("user"), &user, "zip")), r#""user"."zip_code""#);
        assert_eq!(sql(&column(None, &user, "id")), r#""id""#);
    }

    #[test]
    fn test_property_path_into_json() {
        let user = user();
        assert_eq!(
            sql(&property_path(None, &user, "address.city")),
            r#""address"->>'city'"#
        );
        assert_eq!(
            sql(&property_path(Some("t_0_0_user"), &user, "address.geo.lat")),
            r#""t_0_0_user"."address"->'geo'->>'lat'"#
        );
        assert_eq!(sql(&property_path(None, &user, "zip")), r#""zip_code""#);
    }
}
