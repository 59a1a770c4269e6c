//! Text rendering of query results.
//!
//! A row renders as `{a=1, b=[x, y], c=[{time=t, value=v}]}`. The output is
//! meant for people; nothing parses it back.

use crate::error::DecodeError;
use crate::schema::{describe_schema, ColumnInfo, ColumnType};
use crate::types::{Datum, Row};

const SEPARATOR: &str = ", ";

/// Render a whole page: the schema description plus one line per row.
pub fn decode_page(schema: &[ColumnInfo], rows: &[Row]) -> Result<(String, Vec<String>), DecodeError> {
    let rendered = rows
        .iter()
        .map(|row| decode_row(schema, row.data()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((describe_schema(schema), rendered))
}

/// Render one row against its schema.
pub fn decode_row(schema: &[ColumnInfo], row: &[Datum]) -> Result<String, DecodeError> {
    if schema.len() != row.len() {
        return Err(DecodeError::SchemaMismatch {
            expected: schema.len(),
            actual: row.len(),
        });
    }

    let mut out = String::from("{");
    for (i, (info, datum)) in schema.iter().zip(row).enumerate() {
        if i > 0 {
            out.push_str(SEPARATOR);
        }
        out.push_str(&decode_datum(info, datum)?);
    }
    out.push('}');
    Ok(out)
}

/// Render one value against its column.
pub fn decode_datum(info: &ColumnInfo, datum: &Datum) -> Result<String, DecodeError> {
    if datum.is_null() {
        return Ok(match info.name() {
            Some(name) => format!("{name}=NULL"),
            None => "NULL".to_string(),
        });
    }

    match &info.column_type {
        ColumnType::TimeSeries(value_info) => {
            let Datum::TimeSeries(points) = datum else {
                return Err(shape_mismatch(info, datum));
            };
            let mut out = String::from("[");
            for (i, point) in points.iter().enumerate() {
                if i > 0 {
                    out.push_str(SEPARATOR);
                }
                out.push_str("{time=");
                out.push_str(&point.time);
                out.push_str(", value=");
                out.push_str(&decode_datum(value_info, &point.value)?);
                out.push('}');
            }
            out.push(']');
            Ok(out)
        }
        ColumnType::Array(element) => {
            let Datum::Array(items) = datum else {
                return Err(shape_mismatch(info, datum));
            };
            let mut out = name_prefix(info);
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(SEPARATOR);
                }
                out.push_str(&decode_datum(element, item)?);
            }
            out.push(']');
            Ok(out)
        }
        ColumnType::Row(columns) => {
            let Datum::Row(data) = datum else {
                return Err(shape_mismatch(info, datum));
            };
            decode_row(columns, data)
        }
        ColumnType::Scalar(_) => {
            let Datum::Scalar(value) = datum else {
                return Err(shape_mismatch(info, datum));
            };
            let mut out = name_prefix(info);
            out.push_str(value);
            Ok(out)
        }
    }
}

fn name_prefix(info: &ColumnInfo) -> String {
    match info.name() {
        Some(name) => format!("{name}="),
        None => String::new(),
    }
}

fn shape_mismatch(info: &ColumnInfo, datum: &Datum) -> DecodeError {
    DecodeError::malformed(format!(
        "column {} of type {} cannot hold {}",
        info.name().unwrap_or("<unnamed>"),
        info.column_type,
        datum.tag()
    ))
}
