//! PostgreSQL type mapping and value decoding.
//!
//! Statements run over the simple query protocol, so every value arrives in
//! PostgreSQL's text output format (`t`/`f` booleans, `\x`-prefixed bytea,
//! `{...}` array literals). `PgRawRow` keeps that text and parses on access.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

use crate::error::{Error, Result};
use crate::services::database::traits::{
    ColumnMeta, RawRow, SqlType, Value, ValueDecoder, decode_standard,
};

/// Map a PostgreSQL type name to a portable type code.
pub fn pg_sql_type(type_name: &str) -> SqlType {
    let upper = type_name.to_ascii_uppercase();
    if upper.ends_with("[]") || upper.starts_with('_') {
        return SqlType::Array;
    }
    match upper.as_str() {
        "BOOL" | "BOOLEAN" => SqlType::Boolean,
        "INT2" | "SMALLINT" => SqlType::SmallInt,
        "INT4" | "INT" | "INTEGER" => SqlType::Integer,
        "INT8" | "BIGINT" | "OID" => SqlType::BigInt,
        "FLOAT4" | "REAL" => SqlType::Real,
        "FLOAT8" | "DOUBLE PRECISION" => SqlType::Double,
        "NUMERIC" | "DECIMAL" => SqlType::Numeric,
        "CHAR" | "BPCHAR" => SqlType::Char,
        "VARCHAR" | "NAME" => SqlType::VarChar,
        "TEXT" | "CITEXT" => SqlType::LongVarChar,
        "BYTEA" => SqlType::VarBinary,
        "DATE" => SqlType::Date,
        "TIME" => SqlType::Time,
        "TIMETZ" => SqlType::TimeWithTimezone,
        "TIMESTAMP" => SqlType::Timestamp,
        "TIMESTAMPTZ" => SqlType::TimestampWithTimezone,
        _ => SqlType::Other,
    }
}

/// Column metadata of a fetched PostgreSQL row.
pub fn column_meta(row: &PgRow) -> Vec<ColumnMeta> {
    row.columns()
        .iter()
        .map(|col| {
            let type_name = col.type_info().name();
            ColumnMeta::new(col.name(), pg_sql_type(type_name), type_name)
        })
        .collect()
}

/// Parse a one-dimensional array literal such as `{1,NULL,"a,b"}`.
///
/// Nested arrays are returned as their literal text.
pub fn parse_array_literal(literal: &str) -> Result<Vec<Option<String>>> {
    let invalid = || Error::Execution(format!("malformed array literal: {}", literal));

    let mut text = literal.trim();
    // optional dimension decoration, e.g. `[0:2]={1,2,3}`
    if text.starts_with('[') {
        text = text.split_once('=').map(|(_, rest)| rest).ok_or_else(invalid)?;
    }
    let body = text
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .ok_or_else(invalid)?;

    let chars: Vec<char> = body.chars().collect();
    let mut items = Vec::new();
    let mut i = 0;
    if chars.iter().all(|c| c.is_whitespace()) {
        return Ok(items);
    }

    loop {
        while chars.get(i).is_some_and(|c| c.is_whitespace()) {
            i += 1;
        }

        match chars.get(i) {
            Some('"') => {
                let mut item = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('\\') => {
                            item.push(*chars.get(i + 1).ok_or_else(invalid)?);
                            i += 2;
                        }
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some(c) => {
                            item.push(*c);
                            i += 1;
                        }
                        None => return Err(invalid()),
                    }
                }
                items.push(Some(item));
            }
            Some('{') => {
                let start = i;
                let mut depth = 0;
                while let Some(c) = chars.get(i) {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                items.push(Some(chars[start..i].iter().collect()));
            }
            _ => {
                let start = i;
                while chars.get(i).is_some_and(|c| *c != ',') {
                    i += 1;
                }
                let item: String = chars[start..i].iter().collect::<String>().trim().to_string();
                if item.eq_ignore_ascii_case("NULL") {
                    items.push(None);
                } else {
                    items.push(Some(item));
                }
            }
        }

        while chars.get(i).is_some_and(|c| c.is_whitespace()) {
            i += 1;
        }
        match chars.get(i) {
            Some(',') => i += 1,
            None => break,
            Some(_) => return Err(invalid()),
        }
    }

    Ok(items)
}

/// A fetched PostgreSQL row, detached from the connection.
#[derive(Debug, Clone)]
pub struct PgRawRow {
    cells: Vec<Option<String>>,
}

impl PgRawRow {
    pub fn new(cells: Vec<Option<String>>) -> Self {
        Self { cells }
    }

    pub fn from_row(row: &PgRow) -> Result<Self> {
        let cells = (0..row.len())
            .map(|i| row.try_get_unchecked::<Option<String>, _>(i))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(cells))
    }

    fn text(&self, index: usize) -> Result<Option<&str>> {
        self.cells
            .get(index)
            .map(|c| c.as_deref())
            .ok_or_else(|| Error::Execution(format!("column index {} out of range", index)))
    }

    fn convert<T>(&self, index: usize, parse: impl Fn(&str) -> Option<T>) -> Result<Option<T>> {
        match self.text(index)? {
            Some(s) => parse(s).map(Some).ok_or_else(|| {
                Error::Execution(format!("cannot convert column {} value '{}'", index, s))
            }),
            None => Ok(None),
        }
    }
}

impl RawRow for PgRawRow {
    fn len(&self) -> usize {
        self.cells.len()
    }

    fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.text(index)?.is_none())
    }

    fn get_string(&self, index: usize) -> Result<Option<String>> {
        Ok(self.text(index)?.map(str::to_string))
    }

    fn get_i64(&self, index: usize) -> Result<Option<i64>> {
        self.convert(index, |s| s.parse().ok())
    }

    fn get_f64(&self, index: usize) -> Result<Option<f64>> {
        self.convert(index, |s| s.parse().ok())
    }

    fn get_decimal(&self, index: usize) -> Result<Option<String>> {
        Ok(self.text(index)?.map(str::to_string))
    }

    fn get_bool(&self, index: usize) -> Result<Option<bool>> {
        self.convert(index, |s| match s {
            "t" | "true" | "1" => Some(true),
            "f" | "false" | "0" => Some(false),
            _ => None,
        })
    }

    fn get_date(&self, index: usize) -> Result<Option<NaiveDate>> {
        self.convert(index, |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }

    fn get_time(&self, index: usize) -> Result<Option<NaiveTime>> {
        self.convert(index, |s| NaiveTime::parse_from_str(s, "%H:%M:%S%.f").ok())
    }

    fn get_timestamp(&self, index: usize) -> Result<Option<NaiveDateTime>> {
        self.convert(index, |s| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()
        })
    }

    fn get_bytes(&self, index: usize) -> Result<Option<Vec<u8>>> {
        self.convert(index, |s| match s.strip_prefix("\\x") {
            Some(encoded) => hex::decode(encoded).ok(),
            None => Some(s.as_bytes().to_vec()),
        })
    }

    fn get_array(&self, index: usize) -> Result<Option<Vec<Option<String>>>> {
        match self.text(index)? {
            Some(s) => parse_array_literal(s).map(Some),
            None => Ok(None),
        }
    }
}

/// Value decoder for PostgreSQL result sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgValueDecoder;

impl ValueDecoder for PgValueDecoder {
    fn decode(
        &self,
        row: &dyn RawRow,
        index: usize,
        sql_type: SqlType,
        type_name: &str,
    ) -> Result<Value> {
        match sql_type {
            SqlType::TimestampWithTimezone => Ok(row
                .get_string(index)?
                .map(|s| match DateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f%#z") {
                    Ok(ts) => Value::Text(ts.format("%Y-%m-%dT%H:%M:%S%.f%:z").to_string()),
                    Err(_) => Value::Text(s),
                })
                .unwrap_or_default()),
            SqlType::TimeWithTimezone => Ok(row.get_string(index)?.into()),
            // infinity, BC dates
            SqlType::Date | SqlType::Timestamp => match decode_standard(row, index, sql_type) {
                Ok(value) => Ok(value),
                Err(_) => Ok(row.get_string(index)?.into()),
            },
            SqlType::Other => match type_name.to_ascii_uppercase().as_str() {
                "UUID" => Ok(row.get_string(index)?.map(|s| s.to_lowercase()).into()),
                _ => Ok(row.get_string(index)?.into()),
            },
            _ => decode_standard(row, index, sql_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(type_name: &str, cell: Option<&str>) -> Value {
        let row = PgRawRow::new(vec![cell.map(str::to_string)]);
        PgValueDecoder
            .decode(&row, 0, pg_sql_type(type_name), type_name)
            .unwrap()
    }

    #[test]
    fn test_type_mapping() {
        assert_eq!(pg_sql_type("INT4"), SqlType::Integer);
        assert_eq!(pg_sql_type("NUMERIC"), SqlType::Numeric);
        assert_eq!(pg_sql_type("TEXT[]"), SqlType::Array);
        assert_eq!(pg_sql_type("_int4"), SqlType::Array);
        assert_eq!(pg_sql_type("JSONB"), SqlType::Other);
        assert_eq!(pg_sql_type("TIMESTAMPTZ"), SqlType::TimestampWithTimezone);
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode("BOOL", Some("t")), Value::Bool(true));
        assert_eq!(decode("BOOL", Some("f")), Value::Bool(false));
        assert_eq!(decode("INT2", Some("7")), Value::Int(7));
        assert_eq!(decode("INT8", Some("9000000000")), Value::Long(9_000_000_000));
        assert_eq!(decode("FLOAT8", Some("NaN")).to_display_string(), "NaN");
        assert_eq!(
            decode("NUMERIC", Some("123456789012345678901234567890.5")),
            Value::Text("123456789012345678901234567890.5".into())
        );
        assert_eq!(decode("TEXT", None), Value::Null);
    }

    #[test]
    fn test_decode_bytea_as_hex() {
        assert_eq!(decode("BYTEA", Some("\\x1a2b")), Value::Text("0x1a2b".into()));
        assert_eq!(decode("BYTEA", Some("\\x")), Value::Text("0x".into()));
    }

    #[test]
    fn test_decode_temporal() {
        assert_eq!(decode("DATE", Some("2024-01-15")), Value::Text("2024-01-15".into()));
        assert_eq!(decode("DATE", Some("infinity")), Value::Text("infinity".into()));
        assert_eq!(
            decode("TIMESTAMP", Some("2024-01-15 10:15:30.5")),
            Value::Text("2024-01-15T10:15:30.500".into())
        );
        assert_eq!(
            decode("TIMESTAMPTZ", Some("2024-01-15 10:15:30+02")),
            Value::Text("2024-01-15T10:15:30+02:00".into())
        );
    }

    #[test]
    fn test_decode_json_and_uuid() {
        assert_eq!(
            decode("JSONB", Some(r#"{"a": [1, 2]}"#)),
            Value::Text(r#"{"a": [1, 2]}"#.into())
        );
        assert_eq!(
            decode("UUID", Some("A0EEBC99-9C0B-4EF8-BB6D-6BB9BD380A11")),
            Value::Text("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11".into())
        );
    }

    #[test]
    fn test_decode_arrays() {
        assert_eq!(
            decode("INT4[]", Some("{1,NULL,3}")),
            Value::Array(vec![Value::Text("1".into()), Value::Null, Value::Text("3".into())])
        );
        assert_eq!(decode("TEXT[]", Some("{}")), Value::Array(vec![]));
    }

    #[test]
    fn test_parse_array_literal() {
        assert_eq!(
            parse_array_literal(r#"{"a,b","say \"hi\"",NULL,"NULL", plain }"#).unwrap(),
            vec![
                Some("a,b".to_string()),
                Some("say \"hi\"".to_string()),
                None,
                Some("NULL".to_string()),
                Some("plain".to_string()),
            ]
        );
        assert_eq!(
            parse_array_literal("{{1,2},{3,4}}").unwrap(),
            vec![Some("{1,2}".to_string()), Some("{3,4}".to_string())]
        );
        assert_eq!(
            parse_array_literal("[0:1]={5,6}").unwrap(),
            vec![Some("5".to_string()), Some("6".to_string())]
        );
        assert!(parse_array_literal("1,2").is_err());
        assert!(parse_array_literal(r#"{"open}"#).is_err());
    }

    #[test]
    fn test_bad_boolean_fails() {
        let row = PgRawRow::new(vec![Some("maybe".to_string())]);
        assert!(row.get_bool(0).is_err());
    }
}
