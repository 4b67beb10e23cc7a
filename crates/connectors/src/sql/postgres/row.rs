use model::{
    core::value::Value,
    records::row::{FieldValue, RowData},
};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use tokio_postgres::{Row, types::FromSql};
use tracing::warn;

/// Decodes a driver row into column-keyed field values.
pub(crate) fn to_row_data(row: &Row) -> RowData {
    let field_values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = decode(row, idx).unwrap_or_else(|error| {
                warn!(column = column.name(), %error, "Failed to decode column, using NULL");
                Value::Null
            });
            FieldValue {
                name: column.name().to_string(),
                value,
            }
        })
        .collect();

    RowData::new("", field_values)
}

fn decode(row: &Row, idx: usize) -> Result<Value, tokio_postgres::Error> {
    let ty = row.columns()[idx].type_();
    match ty.name() {
        "int2" => cell(row, idx, |v: i16| Value::Int(v.into())),
        "int4" => cell(row, idx, |v: i32| Value::Int(v.into())),
        "int8" => cell(row, idx, Value::Int),
        "oid" => cell(row, idx, |v: u32| Value::Uint(v.into())),
        "float4" => cell(row, idx, |v: f32| Value::Float(v.into())),
        "float8" => cell(row, idx, Value::Float),
        "numeric" => cell(row, idx, |v: Decimal| {
            v.to_f64().map_or(Value::String(v.to_string()), Value::Float)
        }),
        "bool" => cell(row, idx, Value::Boolean),
        "json" | "jsonb" => cell(row, idx, Value::Json),
        "uuid" => cell(row, idx, Value::Uuid),
        "timestamptz" => cell(row, idx, Value::Timestamp),
        "timestamp" => cell(row, idx, Value::TimestampNaive),
        "date" => cell(row, idx, Value::Date),
        "bytea" => cell(row, idx, Value::Bytes),
        // Text-like and user-defined types (enums, domains) come back as strings.
        _ => cell(row, idx, Value::String),
    }
}

fn cell<'a, T: FromSql<'a>>(
    row: &'a Row,
    idx: usize,
    into: impl FnOnce(T) -> Value,
) -> Result<Value, tokio_postgres::Error> {
    Ok(row
        .try_get::<_, Option<T>>(idx)?
        .map(into)
        .unwrap_or(Value::Null))
}
