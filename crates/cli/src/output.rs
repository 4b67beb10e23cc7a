use crate::error::CliError;
use compiler::CompiledQuery;
use model::records::row::RowData;
use serde_json::{Value as JsonValue, json};

pub fn compiled_json(query: &CompiledQuery) -> JsonValue {
    json!({
        "sql": query.sql,
        "bindings": query.bindings.iter().map(|v| v.to_json()).collect::<Vec<_>>(),
    })
}

pub fn rows_json(rows: &[RowData]) -> JsonValue {
    JsonValue::Array(rows.iter().map(RowData::to_json).collect())
}

pub fn print_json(value: &JsonValue) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(CliError::JsonSerialize)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{core::value::Value, records::row::FieldValue};

    #[test]
    fn test_compiled_json() {
        let query = CompiledQuery {
            sql: r#"select * from "foo" where "a" = $1"#.to_string(),
            bindings: vec![Value::Int(5), Value::Null],
        };
        assert_eq!(
            compiled_json(&query),
            json!({"sql": r#"select * from "foo" where "a" = $1"#, "bindings": [5, null]})
        );
    }

    #[test]
    fn test_rows_json_keeps_field_order() {
        let row = RowData::new(
            "Org",
            vec![
                FieldValue {
                    name: "name".into(),
                    value: Value::String("acme".into()),
                },
                FieldValue {
                    name: "id".into(),
                    value: Value::Int(1),
                },
            ],
        );
        let rendered = serde_json::to_string(&rows_json(&[row])).unwrap();
        assert_eq!(rendered, r#"[{"name":"acme","id":1}]"#);
    }
}
