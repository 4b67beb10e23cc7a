use crate::error::DbError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use model::core::value::Value;
use rust_decimal::{Decimal, prelude::FromPrimitive};
use std::str::FromStr;
use tokio_postgres::types::{Json as PgJson, ToSql, Type};
use uuid::Uuid;

pub struct PgParam(Box<dyn ToSql + Sync + Send>);

impl PgParam {
    fn new<T: ToSql + Sync + Send + 'static>(value: T) -> Self {
        PgParam(Box::new(value))
    }

    /// Binds `value` by its own variant, leaving the type check to the driver.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Int(v) => Self::new(v),
            Value::Uint(v) => Self::new(v as i64),
            Value::Float(v) => Self::new(v),
            Value::String(v) => Self::new(v),
            Value::Boolean(v) => Self::new(v),
            Value::Json(v) => Self::new(PgJson(v)),
            Value::Uuid(v) => Self::new(v),
            Value::Bytes(v) => Self::new(v),
            Value::Date(v) => Self::new(v),
            Value::Timestamp(v) => Self::new(v),
            Value::TimestampNaive(v) => Self::new(v),
            Value::Null => Self::new(Option::<String>::None),
        }
    }

    /// Converts `value` into the Rust type the driver expects for `ty`.
    ///
    /// Filter literals arrive as JSON scalars, so a numeric string has to
    /// bind against an `int4` column and an integer against `text`.
    /// Returns `None` when the value has no sensible reading as `ty`.
    pub fn coerce(value: &Value, ty: &Type) -> Option<Self> {
        if value.is_null() {
            return Some(Self::null(ty));
        }

        let param = match ty.name() {
            "int2" => Self::new(i16::try_from(value.as_i64()?).ok()?),
            "int4" => Self::new(i32::try_from(value.as_i64()?).ok()?),
            "int8" => Self::new(value.as_i64()?),
            "float4" => Self::new(value.as_f64()? as f32),
            "float8" => Self::new(value.as_f64()?),
            "numeric" => Self::new(to_decimal(value)?),
            "bool" => Self::new(value.as_bool()?),
            "text" | "varchar" | "bpchar" | "name" => Self::new(value.as_string()?),
            "json" | "jsonb" => Self::new(PgJson(value.to_json())),
            "uuid" => Self::new(to_uuid(value)?),
            "timestamptz" => Self::new(to_timestamp(value)?),
            "timestamp" => Self::new(to_naive_timestamp(value)?),
            "date" => Self::new(to_date(value)?),
            "bytea" => match value {
                Value::Bytes(bytes) => Self::new(bytes.clone()),
                other => Self::new(other.as_string()?.into_bytes()),
            },
            _ => Self::from_value(value.clone()),
        };
        Some(param)
    }

    /// A typed `NULL`; the driver rejects a `None` whose type does not accept `ty`.
    fn null(ty: &Type) -> Self {
        match ty.name() {
            "int2" => Self::new(Option::<i16>::None),
            "int4" => Self::new(Option::<i32>::None),
            "int8" => Self::new(Option::<i64>::None),
            "float4" => Self::new(Option::<f32>::None),
            "float8" => Self::new(Option::<f64>::None),
            "numeric" => Self::new(Option::<Decimal>::None),
            "bool" => Self::new(Option::<bool>::None),
            "json" | "jsonb" => Self::new(Option::<PgJson<serde_json::Value>>::None),
            "uuid" => Self::new(Option::<Uuid>::None),
            "timestamptz" => Self::new(Option::<DateTime<Utc>>::None),
            "timestamp" => Self::new(Option::<NaiveDateTime>::None),
            "date" => Self::new(Option::<NaiveDate>::None),
            "bytea" => Self::new(Option::<Vec<u8>>::None),
            _ => Self::new(Option::<String>::None),
        }
    }
}

impl AsRef<dyn ToSql + Sync> for PgParam {
    fn as_ref(&self) -> &(dyn ToSql + Sync + 'static) {
        &*self.0
    }
}

pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    /// Coerces each binding to the parameter type of the prepared statement.
    pub fn coerce(values: &[Value], types: &[Type]) -> Result<Self, DbError> {
        let params = values
            .iter()
            .enumerate()
            .map(|(idx, value)| match types.get(idx) {
                Some(ty) => PgParam::coerce(value, ty).ok_or_else(|| DbError::Coercion {
                    index: idx + 1,
                    expected: ty.name().to_string(),
                    value: value.to_string(),
                }),
                None => Ok(PgParam::from_value(value.clone())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { params })
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param.as_ref())
            .collect::<Vec<_>>()
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Float(v) => Decimal::from_f64(*v),
        other => Decimal::from_str(&other.as_string()?).ok(),
    }
}

fn to_uuid(value: &Value) -> Option<Uuid> {
    match value {
        Value::Uuid(v) => Some(*v),
        other => Uuid::parse_str(&other.as_string()?).ok(),
    }
}

fn to_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Timestamp(v) => Some(*v),
        Value::TimestampNaive(v) => Some(v.and_utc()),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<NaiveDateTime>().ok().map(|t| t.and_utc())),
        _ => None,
    }
}

fn to_naive_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::TimestampNaive(v) => Some(*v),
        Value::Timestamp(v) => Some(v.naive_utc()),
        Value::String(s) => s
            .parse::<NaiveDateTime>()
            .ok()
            .or_else(|| to_timestamp(value).map(|t| t.naive_utc())),
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(v) => Some(*v),
        Value::Timestamp(v) => Some(v.date_naive()),
        Value::TimestampNaive(v) => Some(v.date()),
        Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .or_else(|| to_naive_timestamp(value).map(|t| t.date())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use tokio_postgres::types::IsNull;

    fn encode(value: Value, ty: &Type) -> Vec<u8> {
        let param = PgParam::coerce(&value, ty).expect("coercible value");
        let mut buf = BytesMut::new();
        let is_null = param.as_ref().to_sql_checked(ty, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::No));
        buf.to_vec()
    }

    #[test]
    fn test_numeric_string_binds_as_integer() {
        assert_eq!(encode(Value::String("5".into()), &Type::INT4), 5i32.to_be_bytes());
        assert_eq!(encode(Value::String("7".into()), &Type::INT2), 7i16.to_be_bytes());
        assert_eq!(encode(Value::Int(9), &Type::INT8), 9i64.to_be_bytes());
    }

    #[test]
    fn test_integer_binds_as_text() {
        assert_eq!(encode(Value::Int(42), &Type::TEXT), b"42".to_vec());
    }

    #[test]
    fn test_float_and_bool() {
        assert_eq!(encode(Value::Int(2), &Type::FLOAT8), 2f64.to_be_bytes());
        assert_eq!(encode(Value::String("true".into()), &Type::BOOL), vec![1]);
    }

    #[test]
    fn test_uuid_from_string() {
        let id = Uuid::parse_str("6f1c2b0e-3a4d-4c5e-9f60-7a8b9c0d1e2f").unwrap();
        assert_eq!(
            encode(Value::String(id.to_string()), &Type::UUID),
            id.as_bytes().to_vec()
        );
    }

    #[test]
    fn test_null_is_typed() {
        let param = PgParam::coerce(&Value::Null, &Type::INT4).unwrap();
        let mut buf = BytesMut::new();
        let is_null = param.as_ref().to_sql_checked(&Type::INT4, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }

    #[test]
    fn test_out_of_range_fails() {
        assert!(PgParam::coerce(&Value::Int(70_000), &Type::INT2).is_none());
        assert!(PgParam::coerce(&Value::String("abc".into()), &Type::INT4).is_none());
    }

    #[test]
    fn test_store_reports_parameter_position() {
        let result = PgParamStore::coerce(
            &[Value::Int(1), Value::String("x".into())],
            &[Type::INT4, Type::INT4],
        );
        match result {
            Err(DbError::Coercion { index, expected, value }) => {
                assert_eq!(index, 2);
                assert_eq!(expected, "int4");
                assert_eq!(value, "x");
            }
            _ => panic!("expected a coercion error"),
        }
    }
}
