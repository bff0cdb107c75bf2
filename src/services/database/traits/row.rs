//! Dialect-neutral row and value types.
//!
//! This module contains:
//! - `Value` - The decoded, dialect-neutral representation of one cell
//! - `SqlType` - Portable SQL type codes reported by a dialect for each column
//! - `ColumnMeta` - Name and type of a result column
//! - `RawRow` - Typed access to one undecoded row, implemented per dialect

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::Result;

/// A decoded cell value.
///
/// Every dialect decodes into this shape: text, numbers, booleans,
/// ISO-8601 strings for temporal values, `0x`-prefixed hex for binary data
/// and canonical strings for exact decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// NULL value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Small and medium integers, widened to 32 bits
    Int(i32),
    /// 64-bit integers
    Long(i64),
    /// Single precision floating point
    Float(f32),
    /// Double precision floating point
    Double(f64),
    /// Text, including decimals, dates, hex-encoded binary and JSON
    Text(String),
    /// Expanded array value
    Array(Vec<Value>),
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to extract as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to extract as an i64 (will convert smaller integers)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert this value to a display string
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Text(s) => s.clone(),
            Value::Array(arr) => {
                let items: Vec<String> = arr.iter().map(|v| v.to_display_string()).collect();
                format!("[{}]", items.join(", "))
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display_string())
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

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// Encode bytes as a `0x`-prefixed lowercase hex string.
pub fn to_hex_literal(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Portable SQL type codes.
///
/// Each dialect maps its native column types onto these codes; value
/// decoders dispatch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SqlType {
    Char,
    VarChar,
    LongVarChar,
    NChar,
    NVarChar,
    LongNVarChar,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Decimal,
    Numeric,
    Boolean,
    Bit,
    Date,
    Time,
    TimeWithTimezone,
    Timestamp,
    TimestampWithTimezone,
    Binary,
    VarBinary,
    LongVarBinary,
    Blob,
    Clob,
    NClob,
    Array,
    Other,
}

/// Name and type of one result column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMeta {
    /// Column label as reported by the dialect
    pub name: String,
    /// Portable type code
    pub sql_type: SqlType,
    /// Native type name, e.g. `VARCHAR` or `JSON`
    pub type_name: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, sql_type: SqlType, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type,
            type_name: type_name.into(),
        }
    }
}

/// Typed access to one fetched, undecoded row.
///
/// Every getter returns `Ok(None)` for SQL NULL. Large values are handed out
/// as owned buffers, so nothing stays borrowed from the driver once a getter
/// returns.
pub trait RawRow: Send + Sync {
    /// Number of columns in the row
    fn len(&self) -> usize;

    /// Check if the row has no columns
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_null(&self, index: usize) -> Result<bool>;
    fn get_string(&self, index: usize) -> Result<Option<String>>;
    fn get_i64(&self, index: usize) -> Result<Option<i64>>;
    fn get_f64(&self, index: usize) -> Result<Option<f64>>;
    /// Exact decimal in its canonical string form
    fn get_decimal(&self, index: usize) -> Result<Option<String>>;
    fn get_bool(&self, index: usize) -> Result<Option<bool>>;
    fn get_date(&self, index: usize) -> Result<Option<NaiveDate>>;
    fn get_time(&self, index: usize) -> Result<Option<NaiveTime>>;
    fn get_timestamp(&self, index: usize) -> Result<Option<NaiveDateTime>>;
    fn get_bytes(&self, index: usize) -> Result<Option<Vec<u8>>>;
    /// Array elements in their text form
    fn get_array(&self, index: usize) -> Result<Option<Vec<Option<String>>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_null_check() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());
        assert!(!Value::Int(42).is_null());
        assert!(!Value::Text("hello".to_string()).is_null());
    }

    #[test]
    fn test_value_display_string() {
        assert_eq!(Value::Null.to_display_string(), "NULL");
        assert_eq!(Value::Bool(false).to_display_string(), "false");
        assert_eq!(Value::Int(42).to_display_string(), "42");
        assert_eq!(Value::Long(-123).to_display_string(), "-123");
        assert_eq!(Value::Double(3.5).to_display_string(), "3.5");
        assert_eq!(
            Value::Array(vec![Value::Int(1), Value::Null]).to_display_string(),
            "[1, NULL]"
        );
    }

    #[test]
    fn test_value_serializes_untagged() {
        let row = vec![
            Value::Int(1),
            Value::Text("a".to_string()),
            Value::Null,
            Value::Bool(true),
            Value::Array(vec![Value::Long(7)]),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[1,"a",null,true,[7]]"#);
    }

    #[test]
    fn test_hex_literal() {
        assert_eq!(to_hex_literal(&[0xDE, 0xAD, 0x0B]), "0xdead0b");
        assert_eq!(to_hex_literal(&[]), "0x");
    }

    #[test]
    fn test_value_from_option() {
        let some_val: Value = Some("x").into();
        assert_eq!(some_val, Value::Text("x".to_string()));

        let none_val: Value = Option::<String>::None.into();
        assert_eq!(none_val, Value::Null);
    }
}
