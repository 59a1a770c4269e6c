//! Model and decoders for self-describing time-series query results.

pub mod decoder;
pub mod error;
pub mod schema;
pub mod typed;
pub mod types;
pub mod wire;

pub use decoder::{decode_datum, decode_page, decode_row};
pub use error::DecodeError;
pub use schema::{column_label, describe_schema, ColumnInfo, ColumnType, ScalarType};
pub use typed::{parse_datum, ResultTable};
pub use types::{Datum, Page, QueryStatus, Row, TimePoint};
pub use wire::{
    page_from_json, WireColumnInfo, WireDatum, WirePage, WireRow, WireTimePoint, WireType,
};
