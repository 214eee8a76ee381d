//! Dynamic SQL values.
//!
//! [`Value`] is what the builder binds into its parameter map and what the
//! generic [`Record`](crate::Record) row holds. It converts to whatever
//! parameter type Postgres inferred for the placeholder, so `where_eq("id", "5")`
//! works against an integer column the same way `where_eq("id", 5)` does.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use rust_decimal::Decimal;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type, WrongType, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as a SQL literal.
    ///
    /// Numbers are emitted bare, text is single-quoted with embedded quotes
    /// doubled, `Null` becomes `NULL`. Used for inline `IN (...)` lists,
    /// `HAVING` values and the debug form of executed statements.
    pub fn to_inline_sql(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) if v.is_finite() => v.to_string(),
            Value::Float(v) => quote(&v.to_string()),
            Value::Text(s) => quote(s),
            Value::Json(v) => quote(&v.to_string()),
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

// ==================== Conversions into Value ====================

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Text(v.format("%Y-%m-%d %H:%M:%S%.f").to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Text(v.to_rfc3339())
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Text(v.to_string())
    }
}

/// Kept as text so no precision is lost; it encodes back to `NUMERIC`
/// exactly.
impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

// ==================== Postgres encoding ====================
//
// Each variant is encoded in the binary format of the parameter type the
// server inferred. Types with no faithful encoding fail with `WrongType`.

fn is_text_type(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty)
}

fn wrong_type(ty: &Type) -> BoxError {
    Box::new(WrongType::new::<Value>(ty.clone()))
}

fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        Type::BOOL => (v != 0).to_sql(ty, out),
        _ if is_text_type(ty) => v.to_string().to_sql(ty, out),
        _ => Err(wrong_type(ty)),
    }
}

fn float_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => v.to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(v)?.to_sql(ty, out),
        _ if is_text_type(ty) => v.to_string().to_sql(ty, out),
        _ => Err(wrong_type(ty)),
    }
}

fn bool_to_sql(v: bool, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::BOOL => v.to_sql(ty, out),
        _ if is_text_type(ty) => v.to_string().to_sql(ty, out),
        _ => Err(wrong_type(ty)),
    }
}

fn json_to_sql(v: &serde_json::Value, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::JSON | Type::JSONB => v.to_sql(ty, out),
        _ if is_text_type(ty) => v.to_string().to_sql(ty, out),
        _ => Err(wrong_type(ty)),
    }
}

fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => {
            int_to_sql(s.trim().parse::<i64>()?, ty, out)
        }
        Type::FLOAT4 | Type::FLOAT8 => float_to_sql(s.trim().parse::<f64>()?, ty, out),
        Type::NUMERIC => s.trim().parse::<Decimal>()?.to_sql(ty, out),
        Type::BOOL => {
            let v = match s.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "1" | "yes" | "on" => true,
                "f" | "false" | "0" | "no" | "off" => false,
                other => return Err(format!("invalid boolean literal '{other}'").into()),
            };
            v.to_sql(ty, out)
        }
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::UUID => uuid::Uuid::parse_str(s.trim())?.to_sql(ty, out),
        Type::DATE => s.trim().parse::<NaiveDate>()?.to_sql(ty, out),
        Type::TIMESTAMP => {
            let s = s.trim();
            let v = s
                .parse::<NaiveDateTime>()
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))?;
            v.to_sql(ty, out)
        }
        Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(s.trim())?
            .with_timezone(&Utc)
            .to_sql(ty, out),
        Type::BYTEA => s.as_bytes().to_sql(ty, out),
        _ if is_text_type(ty) => s.to_sql(ty, out),
        // The binary form of an enum value is its label.
        _ if matches!(ty.kind(), Kind::Enum(_)) => {
            out.extend_from_slice(s.as_bytes());
            Ok(IsNull::No)
        }
        _ => Err(wrong_type(ty)),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => bool_to_sql(*v, ty, out),
            Value::Int(v) => int_to_sql(*v, ty, out),
            Value::Float(v) => float_to_sql(*v, ty, out),
            Value::Text(s) => text_to_sql(s, ty, out),
            Value::Json(v) => json_to_sql(v, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

// ==================== Postgres decoding ====================

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = if *ty == Type::BOOL {
            Value::Bool(bool::from_sql(ty, raw)?)
        } else if *ty == Type::INT2 {
            Value::Int(i16::from_sql(ty, raw)?.into())
        } else if *ty == Type::INT4 {
            Value::Int(i32::from_sql(ty, raw)?.into())
        } else if *ty == Type::INT8 {
            Value::Int(i64::from_sql(ty, raw)?)
        } else if *ty == Type::OID {
            Value::Int(u32::from_sql(ty, raw)?.into())
        } else if *ty == Type::FLOAT4 {
            Value::Float(f32::from_sql(ty, raw)?.into())
        } else if *ty == Type::FLOAT8 {
            Value::Float(f64::from_sql(ty, raw)?)
        } else if *ty == Type::NUMERIC {
            Value::Text(Decimal::from_sql(ty, raw)?.to_string())
        } else if *ty == Type::JSON || *ty == Type::JSONB {
            Value::Json(serde_json::Value::from_sql(ty, raw)?)
        } else if *ty == Type::TIMESTAMP {
            NaiveDateTime::from_sql(ty, raw)?.into()
        } else if *ty == Type::TIMESTAMPTZ {
            DateTime::<Utc>::from_sql(ty, raw)?.into()
        } else if *ty == Type::DATE {
            NaiveDate::from_sql(ty, raw)?.into()
        } else if *ty == Type::UUID {
            uuid::Uuid::from_sql(ty, raw)?.into()
        } else if <String as FromSql>::accepts(ty) {
            Value::Text(String::from_sql(ty, raw)?)
        } else {
            return Err(format!("unsupported column type '{ty}'").into());
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_sql_quotes_and_escapes_text() {
        assert_eq!(Value::from("O'Brien").to_inline_sql(), "'O''Brien'");
        assert_eq!(Value::from(42).to_inline_sql(), "42");
        assert_eq!(Value::from(1.5).to_inline_sql(), "1.5");
        assert_eq!(Value::Null.to_inline_sql(), "NULL");
        assert_eq!(Value::from(true).to_inline_sql(), "TRUE");
        assert_eq!(Value::from(None::<i32>).to_inline_sql(), "NULL");
    }

    #[test]
    fn numeric_text_converts_for_integer_parameters() {
        let mut out = BytesMut::new();
        let is_null = Value::from("7").to_sql(&Type::INT4, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(&out[..], &7i32.to_be_bytes());
    }

    #[test]
    fn int_narrows_to_parameter_width() {
        let mut out = BytesMut::new();
        Value::from(3i64).to_sql(&Type::INT2, &mut out).unwrap();
        assert_eq!(&out[..], &3i16.to_be_bytes());

        let mut out = BytesMut::new();
        assert!(Value::from(i64::MAX).to_sql(&Type::INT4, &mut out).is_err());
    }

    #[test]
    fn decodes_integers_and_null() {
        let raw = 12i32.to_be_bytes();
        assert_eq!(Value::from_sql(&Type::INT4, &raw).unwrap(), Value::Int(12));
        assert_eq!(Value::from_sql_null(&Type::TEXT).unwrap(), Value::Null);
        assert_eq!(
            Value::from_sql(&Type::TEXT, b"hello").unwrap(),
            Value::Text("hello".into())
        );
    }

    fn encode(value: Value, ty: &Type) -> Result<Vec<u8>, BoxError> {
        let mut out = BytesMut::new();
        value.to_sql(ty, &mut out)?;
        Ok(out.to_vec())
    }

    fn encode_decimal(v: Decimal) -> Vec<u8> {
        let mut out = BytesMut::new();
        v.to_sql(&Type::NUMERIC, &mut out).unwrap();
        out.to_vec()
    }

    #[test]
    fn numbers_encode_as_numeric() {
        assert_eq!(
            encode(Value::from(5), &Type::NUMERIC).unwrap(),
            encode_decimal(Decimal::from(5))
        );
        assert_eq!(
            encode(Value::from("12.50"), &Type::NUMERIC).unwrap(),
            encode_decimal("12.50".parse().unwrap())
        );
        assert_eq!(
            encode(Value::from(1.25), &Type::NUMERIC).unwrap(),
            encode_decimal("1.25".parse().unwrap())
        );
        assert!(encode(Value::from("twelve"), &Type::NUMERIC).is_err());
    }

    #[test]
    fn decodes_numeric_as_exact_text() {
        let raw = encode_decimal("12.50".parse().unwrap());
        assert_eq!(
            Value::from_sql(&Type::NUMERIC, &raw).unwrap(),
            Value::Text("12.50".into())
        );
    }

    #[test]
    fn unsupported_parameter_types_are_rejected() {
        assert!(encode(Value::from(true), &Type::INT4).is_err());
        assert!(encode(Value::from(5), &Type::INTERVAL).is_err());
        assert!(encode(Value::from("10.0.0.1"), &Type::INET).is_err());
        assert!(encode(Value::from(1.5), &Type::INT8).is_err());
        assert!(encode(Value::from(serde_json::json!({"a": 1})), &Type::INT4).is_err());

        let mut out = BytesMut::new();
        let err = Value::from(true)
            .to_sql_checked(&Type::MONEY, &mut out)
            .err().unwrap();
        assert!(err.is::<WrongType>());
    }

    #[test]
    fn text_encodes_enum_labels_and_bytea() {
        let mood = Type::new(
            "mood".to_string(),
            0,
            Kind::Enum(vec!["happy".to_string()]),
            "public".to_string(),
        );
        assert_eq!(encode(Value::from("happy"), &mood).unwrap(), b"happy");
        assert_eq!(encode(Value::from("raw"), &Type::BYTEA).unwrap(), b"raw");
        assert_eq!(encode(Value::from(7), &Type::TEXT).unwrap(), b"7");
    }

    #[test]
    fn numeric_accessors() {
        assert_eq!(Value::from("12").as_i64(), Some(12));
        assert_eq!(Value::from(3).as_f64(), Some(3.0));
        assert_eq!(Value::from("x").as_i64(), None);
        assert_eq!(Value::from("x").as_str(), Some("x"));
    }
}
