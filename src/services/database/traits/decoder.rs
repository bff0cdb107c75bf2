//! Value decoding capability.
//!
//! A `ValueDecoder` turns one raw column of a fetched row into a
//! dialect-neutral `Value`. `decode_standard` implements the dispatch every
//! dialect shares; dialect decoders only special-case what differs
//! (typically the `SqlType::Other` bucket).

use super::row::{RawRow, SqlType, Value, to_hex_literal};
use crate::error::Result;

/// Per-dialect conversion of raw column values.
pub trait ValueDecoder: Send + Sync {
    /// Decode column `index` of `row`.
    ///
    /// # Arguments
    ///
    /// * `row` - The raw row
    /// * `index` - Zero-based column index
    /// * `sql_type` - Portable type code reported for the column
    /// * `type_name` - Native type name reported for the column
    fn decode(
        &self,
        row: &dyn RawRow,
        index: usize,
        sql_type: SqlType,
        type_name: &str,
    ) -> Result<Value>;
}

/// Decode a column using the dispatch shared by all dialects.
pub fn decode_standard(row: &dyn RawRow, index: usize, sql_type: SqlType) -> Result<Value> {
    let value = match sql_type {
        SqlType::Char
        | SqlType::VarChar
        | SqlType::LongVarChar
        | SqlType::NChar
        | SqlType::NVarChar
        | SqlType::LongNVarChar
        | SqlType::Clob
        | SqlType::NClob => row.get_string(index)?.into(),

        SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer => {
            match row.get_i64(index)? {
                Some(v) => match i32::try_from(v) {
                    Ok(small) => Value::Int(small),
                    // unsigned INT columns can exceed i32
                    Err(_) => Value::Long(v),
                },
                None => Value::Null,
            }
        }

        SqlType::BigInt => row.get_i64(index)?.map(Value::Long).unwrap_or_default(),

        SqlType::Float | SqlType::Real => row
            .get_f64(index)?
            .map(|v| Value::Float(v as f32))
            .unwrap_or_default(),

        SqlType::Double => row.get_f64(index)?.map(Value::Double).unwrap_or_default(),

        SqlType::Decimal | SqlType::Numeric => row.get_decimal(index)?.into(),

        SqlType::Boolean | SqlType::Bit => row.get_bool(index)?.map(Value::Bool).unwrap_or_default(),

        SqlType::Date => row
            .get_date(index)?
            .map(|d| Value::Text(d.format("%Y-%m-%d").to_string()))
            .unwrap_or_default(),

        SqlType::Time | SqlType::TimeWithTimezone => row
            .get_time(index)?
            .map(|t| Value::Text(t.format("%H:%M:%S%.f").to_string()))
            .unwrap_or_default(),

        SqlType::Timestamp | SqlType::TimestampWithTimezone => row
            .get_timestamp(index)?
            .map(|ts| Value::Text(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or_default(),

        SqlType::Binary | SqlType::VarBinary | SqlType::LongVarBinary | SqlType::Blob => row
            .get_bytes(index)?
            .map(|b| Value::Text(to_hex_literal(&b)))
            .unwrap_or_default(),

        SqlType::Array => row
            .get_array(index)?
            .map(|items| Value::Array(items.into_iter().map(Value::from).collect()))
            .unwrap_or_default(),

        SqlType::Other => row.get_string(index)?.into(),
    };
    Ok(value)
}

#[cfg(test)]
pub(crate) mod testing {
    //! An in-memory `RawRow` for decoder and engine tests.

    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    use super::super::row::RawRow;
    use crate::error::{Error, Result};

    /// A row holding every cell as optional text, parsed on access.
    #[derive(Debug, Clone)]
    pub struct TextRow(pub Vec<Option<String>>);

    impl TextRow {
        pub fn of(cells: &[Option<&str>]) -> Self {
            TextRow(cells.iter().map(|c| c.map(str::to_string)).collect())
        }

        fn cell(&self, index: usize) -> Result<Option<&str>> {
            self.0
                .get(index)
                .map(|c| c.as_deref())
                .ok_or_else(|| Error::Execution(format!("column index {} out of range", index)))
        }

        fn parse<T: std::str::FromStr>(&self, index: usize) -> Result<Option<T>> {
            match self.cell(index)? {
                Some(s) => s
                    .parse::<T>()
                    .map(Some)
                    .map_err(|_| Error::Execution(format!("cannot convert '{}'", s))),
                None => Ok(None),
            }
        }
    }

    impl RawRow for TextRow {
        fn len(&self) -> usize {
            self.0.len()
        }

        fn is_null(&self, index: usize) -> Result<bool> {
            Ok(self.cell(index)?.is_none())
        }

        fn get_string(&self, index: usize) -> Result<Option<String>> {
            Ok(self.cell(index)?.map(str::to_string))
        }

        fn get_i64(&self, index: usize) -> Result<Option<i64>> {
            self.parse(index)
        }

        fn get_f64(&self, index: usize) -> Result<Option<f64>> {
            self.parse(index)
        }

        fn get_decimal(&self, index: usize) -> Result<Option<String>> {
            // validated, but passed through untouched to keep every digit
            self.parse::<f64>(index)?;
            self.get_string(index)
        }

        fn get_bool(&self, index: usize) -> Result<Option<bool>> {
            Ok(self.cell(index)?.map(|s| s == "1" || s == "true"))
        }

        fn get_date(&self, index: usize) -> Result<Option<NaiveDate>> {
            self.parse(index)
        }

        fn get_time(&self, index: usize) -> Result<Option<NaiveTime>> {
            self.parse(index)
        }

        fn get_timestamp(&self, index: usize) -> Result<Option<NaiveDateTime>> {
            self.parse(index)
        }

        fn get_bytes(&self, index: usize) -> Result<Option<Vec<u8>>> {
            Ok(self.cell(index)?.map(|s| s.as_bytes().to_vec()))
        }

        fn get_array(&self, index: usize) -> Result<Option<Vec<Option<String>>>> {
            Ok(self.cell(index)?.map(|s| {
                s.split(',')
                    .map(|item| match item.trim() {
                        "NULL" => None,
                        other => Some(other.to_string()),
                    })
                    .collect()
            }))
        }
    }
}
