use serde_json::{Map, Number, Value};

use crate::error::DecodeError;
use crate::schema::{column_label, ColumnInfo, ColumnType, ScalarType};
use crate::types::{Datum, Page};

// ════════════════════════════════════════════════════════════════
//  Datum → JSON value
// ════════════════════════════════════════════════════════════════

/// Convert one value into a typed JSON value using its column type.
pub fn parse_datum(info: &ColumnInfo, datum: &Datum) -> Result<Value, DecodeError> {
    if datum.is_null() {
        return Ok(Value::Null);
    }

    match (&info.column_type, datum) {
        (ColumnType::Scalar(scalar), Datum::Scalar(raw)) => parse_scalar(*scalar, raw),
        (ColumnType::Array(element), Datum::Array(items)) => items
            .iter()
            .map(|d| parse_datum(element, d))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (ColumnType::TimeSeries(value_info), Datum::TimeSeries(points)) => points
            .iter()
            .map(|p| {
                let mut obj = Map::new();
                obj.insert("time".into(), Value::String(p.time.clone()));
                obj.insert("value".into(), parse_datum(value_info, &p.value)?);
                Ok(Value::Object(obj))
            })
            .collect::<Result<Vec<_>, DecodeError>>()
            .map(Value::Array),
        (ColumnType::Row(columns), Datum::Row(data)) => {
            if columns.len() != data.len() {
                return Err(DecodeError::SchemaMismatch {
                    expected: columns.len(),
                    actual: data.len(),
                });
            }
            let mut obj = Map::new();
            for (i, (column, d)) in columns.iter().zip(data).enumerate() {
                obj.insert(column_label(column, i), parse_datum(column, d)?);
            }
            Ok(Value::Object(obj))
        }
        (column_type, other) => Err(DecodeError::malformed(format!(
            "column {} of type {column_type} cannot hold {}",
            info.name().unwrap_or("<unnamed>"),
            other.tag()
        ))),
    }
}

fn parse_scalar(scalar: ScalarType, raw: &str) -> Result<Value, DecodeError> {
    match scalar {
        ScalarType::Bigint | ScalarType::Integer => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|e| DecodeError::malformed(format!("{scalar} value {raw:?}: {e}"))),
        ScalarType::Double => {
            let n = raw
                .parse::<f64>()
                .map_err(|e| DecodeError::malformed(format!("{scalar} value {raw:?}: {e}")))?;
            // NaN / Infinity have no JSON number form
            Ok(Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string())))
        }
        ScalarType::Boolean => {
            if raw.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if raw.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(DecodeError::malformed(format!("{scalar} value {raw:?}")))
            }
        }
        _ => Ok(Value::String(raw.to_string())),
    }
}

// ════════════════════════════════════════════════════════════════
//  ResultTable
// ════════════════════════════════════════════════════════════════

/// Column-oriented view of a whole query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    /// Build a table from every page of one query.
    ///
    /// The first page fixes the column set; every later schema and row must
    /// have the same arity.
    pub fn from_pages<'a>(pages: impl IntoIterator<Item = &'a Page>) -> Result<Self, DecodeError> {
        let mut table = ResultTable::default();
        let mut arity: Option<usize> = None;

        for page in pages {
            let expected = *arity.get_or_insert_with(|| {
                table.columns = page
                    .schema
                    .iter()
                    .enumerate()
                    .map(|(i, c)| column_label(c, i))
                    .collect();
                page.schema.len()
            });
            if page.schema.len() != expected {
                return Err(DecodeError::SchemaMismatch {
                    expected,
                    actual: page.schema.len(),
                });
            }
            table.push_page(page)?;
        }

        Ok(table)
    }

    fn push_page(&mut self, page: &Page) -> Result<(), DecodeError> {
        for row in &page.rows {
            if row.len() != page.schema.len() {
                return Err(DecodeError::SchemaMismatch {
                    expected: page.schema.len(),
                    actual: row.len(),
                });
            }
            let values = page
                .schema
                .iter()
                .zip(row.data())
                .map(|(info, d)| parse_datum(info, d))
                .collect::<Result<Vec<_>, _>>()?;
            self.rows.push(values);
        }
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
