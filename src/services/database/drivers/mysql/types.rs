//! MySQL type mapping and value decoding.
//!
//! Statements run over the text protocol, so every fetched value arrives as
//! bytes: the textual rendering for scalar types, raw bytes for `BIT` and
//! binary columns. `MySqlRawRow` keeps those bytes and parses on access.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo};

use crate::error::{Error, Result};
use crate::services::database::traits::{
    ColumnMeta, RawRow, SqlType, Value, ValueDecoder, decode_standard, to_hex_literal,
};

/// Map a MySQL type name, as reported by the server, to a portable type code.
pub fn mysql_sql_type(type_name: &str) -> SqlType {
    match type_name.to_ascii_uppercase().as_str() {
        "BOOLEAN" | "BOOL" => SqlType::Boolean,
        "TINYINT" | "TINYINT UNSIGNED" => SqlType::TinyInt,
        "SMALLINT" | "SMALLINT UNSIGNED" | "YEAR" => SqlType::SmallInt,
        "MEDIUMINT" | "MEDIUMINT UNSIGNED" | "INT" | "INTEGER" => SqlType::Integer,
        "INT UNSIGNED" | "INTEGER UNSIGNED" | "BIGINT" => SqlType::BigInt,
        // exceeds i64
        "BIGINT UNSIGNED" => SqlType::Numeric,
        "FLOAT" => SqlType::Real,
        "DOUBLE" | "DOUBLE PRECISION" | "REAL" => SqlType::Double,
        "DECIMAL" | "NUMERIC" | "DEC" | "FIXED" => SqlType::Decimal,
        "CHAR" | "ENUM" | "SET" => SqlType::Char,
        "VARCHAR" => SqlType::VarChar,
        "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" => SqlType::LongVarChar,
        "BINARY" | "GEOMETRY" => SqlType::Binary,
        "VARBINARY" => SqlType::VarBinary,
        "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => SqlType::Blob,
        "BIT" => SqlType::Bit,
        "DATE" => SqlType::Date,
        "TIME" => SqlType::Time,
        "DATETIME" | "TIMESTAMP" => SqlType::Timestamp,
        _ => SqlType::Other,
    }
}

/// Column metadata of a fetched MySQL row.
pub fn column_meta(row: &MySqlRow) -> Vec<ColumnMeta> {
    row.columns()
        .iter()
        .map(|col| {
            let type_name = col.type_info().name();
            ColumnMeta::new(col.name(), mysql_sql_type(type_name), type_name)
        })
        .collect()
}

/// A fetched MySQL row, detached from the connection.
#[derive(Debug, Clone)]
pub struct MySqlRawRow {
    columns: Arc<Vec<ColumnMeta>>,
    cells: Vec<Option<Vec<u8>>>,
}

impl MySqlRawRow {
    pub fn new(columns: Arc<Vec<ColumnMeta>>, cells: Vec<Option<Vec<u8>>>) -> Self {
        Self { columns, cells }
    }

    pub fn from_row(columns: Arc<Vec<ColumnMeta>>, row: &MySqlRow) -> Result<Self> {
        let cells = (0..row.len())
            .map(|i| row.try_get_unchecked::<Option<Vec<u8>>, _>(i))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(columns, cells))
    }

    fn cell(&self, index: usize) -> Result<Option<&[u8]>> {
        self.cells
            .get(index)
            .map(|c| c.as_deref())
            .ok_or_else(|| Error::Execution(format!("column index {} out of range", index)))
    }

    fn text(&self, index: usize) -> Result<Option<&str>> {
        match self.cell(index)? {
            Some(bytes) => std::str::from_utf8(bytes)
                .map(Some)
                .map_err(|e| Error::Execution(format!("column {} is not valid UTF-8: {}", index, e))),
            None => Ok(None),
        }
    }

    fn parse<T>(&self, index: usize) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.text(index)? {
            Some(s) => s.trim().parse::<T>().map(Some).map_err(|e| {
                Error::Execution(format!("cannot convert column {} value '{}': {}", index, s, e))
            }),
            None => Ok(None),
        }
    }

    fn parse_chrono<T>(
        &self,
        index: usize,
        parse: impl Fn(&str) -> chrono::ParseResult<T>,
    ) -> Result<Option<T>> {
        match self.text(index)? {
            Some(s) => parse(s).map(Some).map_err(|e| {
                Error::Execution(format!("cannot convert column {} value '{}': {}", index, s, e))
            }),
            None => Ok(None),
        }
    }

    fn is_bit_column(&self, index: usize) -> bool {
        self.columns
            .get(index)
            .is_some_and(|c| c.sql_type == SqlType::Bit)
    }
}

impl RawRow for MySqlRawRow {
    fn len(&self) -> usize {
        self.cells.len()
    }

    fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.cell(index)?.is_none())
    }

    fn get_string(&self, index: usize) -> Result<Option<String>> {
        Ok(self.text(index)?.map(str::to_string))
    }

    fn get_i64(&self, index: usize) -> Result<Option<i64>> {
        self.parse(index)
    }

    fn get_f64(&self, index: usize) -> Result<Option<f64>> {
        self.parse(index)
    }

    fn get_decimal(&self, index: usize) -> Result<Option<String>> {
        // the server already renders the exact value
        Ok(self.text(index)?.map(|s| s.trim().to_string()))
    }

    fn get_bool(&self, index: usize) -> Result<Option<bool>> {
        if self.is_bit_column(index) {
            return Ok(self.cell(index)?.map(|b| b.iter().any(|&byte| byte != 0)));
        }
        Ok(self.parse::<i64>(index)?.map(|v| v != 0))
    }

    fn get_date(&self, index: usize) -> Result<Option<NaiveDate>> {
        self.parse_chrono(index, |s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
    }

    fn get_time(&self, index: usize) -> Result<Option<NaiveTime>> {
        self.parse_chrono(index, |s| NaiveTime::parse_from_str(s, "%H:%M:%S%.f"))
    }

    fn get_timestamp(&self, index: usize) -> Result<Option<NaiveDateTime>> {
        self.parse_chrono(index, |s| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        })
    }

    fn get_bytes(&self, index: usize) -> Result<Option<Vec<u8>>> {
        Ok(self.cell(index)?.map(<[u8]>::to_vec))
    }

    fn get_array(&self, _index: usize) -> Result<Option<Vec<Option<String>>>> {
        Err(Error::Execution("MySQL has no array type".to_string()))
    }
}

/// Value decoder for MySQL result sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlValueDecoder;

impl ValueDecoder for MySqlValueDecoder {
    fn decode(
        &self,
        row: &dyn RawRow,
        index: usize,
        sql_type: SqlType,
        type_name: &str,
    ) -> Result<Value> {
        match sql_type {
            // zero dates, negative or >24h TIME values have no chrono form
            SqlType::Date | SqlType::Time | SqlType::Timestamp => {
                match decode_standard(row, index, sql_type) {
                    Ok(value) => Ok(value),
                    Err(_) => Ok(row.get_string(index)?.into()),
                }
            }
            SqlType::Other if type_name.eq_ignore_ascii_case("JSON") => {
                Ok(row.get_string(index)?.into())
            }
            SqlType::Other => match row.get_string(index) {
                Ok(text) => Ok(text.into()),
                Err(_) => Ok(row
                    .get_bytes(index)?
                    .map(|b| Value::Text(to_hex_literal(&b)))
                    .unwrap_or_default()),
            },
            _ => decode_standard(row, index, sql_type),
        }
    }
}
