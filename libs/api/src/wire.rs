//! JSON shape of query results as the service sends them.
//!
//! Every tag is an optional field here; conversion into the closed model
//! types in [`crate::schema`] and [`crate::types`] is where "exactly one tag"
//! gets enforced.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::schema::{ColumnInfo, ColumnType, ScalarType};
use crate::types::{Datum, Page, QueryStatus, Row, TimePoint};

// ════════════════════════════════════════════════════════════════
//  Wire structs
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WirePage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default)]
    pub column_info: Vec<WireColumnInfo>,
    #[serde(default)]
    pub rows: Vec<WireRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_status: Option<QueryStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireColumnInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<WireType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_column_info: Option<Box<WireColumnInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_column_info: Option<Vec<WireColumnInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_series_measure_value_column_info: Option<Box<WireColumnInfo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRow {
    #[serde(default)]
    pub data: Vec<WireDatum>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireDatum {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_series_value: Option<Vec<WireTimePoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_value: Option<Vec<WireDatum>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_value: Option<WireRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_value: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireTimePoint {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub value: Option<WireDatum>,
}

// ════════════════════════════════════════════════════════════════
//  Wire → model
// ════════════════════════════════════════════════════════════════

impl TryFrom<WireColumnInfo> for ColumnInfo {
    type Error = DecodeError;

    fn try_from(wire: WireColumnInfo) -> Result<Self, Self::Error> {
        let label = wire.name.clone().unwrap_or_else(|| "<unnamed>".to_string());
        let t = wire
            .column_type
            .ok_or_else(|| DecodeError::malformed(format!("column {label}: missing Type")))?;

        let tags = usize::from(t.scalar_type.is_some())
            + usize::from(t.array_column_info.is_some())
            + usize::from(t.row_column_info.is_some())
            + usize::from(t.time_series_measure_value_column_info.is_some());
        if tags != 1 {
            return Err(DecodeError::malformed(format!(
                "column {label}: expected exactly one type tag, found {tags}"
            )));
        }

        let column_type = if let Some(ts) = t.time_series_measure_value_column_info {
            ColumnType::TimeSeries(Box::new(ColumnInfo::try_from(*ts)?))
        } else if let Some(element) = t.array_column_info {
            ColumnType::Array(Box::new(ColumnInfo::try_from(*element)?))
        } else if let Some(columns) = t.row_column_info {
            ColumnType::Row(
                columns
                    .into_iter()
                    .map(ColumnInfo::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            )
        } else {
            // tags == 1 leaves only the scalar tag
            let scalar = t.scalar_type.unwrap_or_default();
            ColumnType::Scalar(ScalarType::from_wire(&scalar))
        };

        Ok(ColumnInfo::new(wire.name, column_type))
    }
}

impl TryFrom<WireDatum> for Datum {
    type Error = DecodeError;

    fn try_from(wire: WireDatum) -> Result<Self, Self::Error> {
        let null = wire.null_value.unwrap_or(false);
        let tags = usize::from(null)
            + usize::from(wire.scalar_value.is_some())
            + usize::from(wire.time_series_value.is_some())
            + usize::from(wire.array_value.is_some())
            + usize::from(wire.row_value.is_some());
        if tags != 1 {
            return Err(DecodeError::malformed(format!(
                "datum: expected exactly one value tag, found {tags}"
            )));
        }

        if null {
            return Ok(Datum::Null);
        }
        if let Some(points) = wire.time_series_value {
            let points = points
                .into_iter()
                .map(|p| {
                    let time = p
                        .time
                        .ok_or_else(|| DecodeError::malformed("time series point: missing Time"))?;
                    let value = p
                        .value
                        .ok_or_else(|| DecodeError::malformed("time series point: missing Value"))?;
                    Ok(TimePoint::new(time, Datum::try_from(value)?))
                })
                .collect::<Result<Vec<_>, DecodeError>>()?;
            return Ok(Datum::TimeSeries(points));
        }
        if let Some(items) = wire.array_value {
            return Ok(Datum::Array(
                items
                    .into_iter()
                    .map(Datum::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            ));
        }
        if let Some(row) = wire.row_value {
            return Ok(Datum::Row(Row::try_from(row)?.0));
        }
        Ok(Datum::Scalar(wire.scalar_value.unwrap_or_default()))
    }
}

impl TryFrom<WireRow> for Row {
    type Error = DecodeError;

    fn try_from(wire: WireRow) -> Result<Self, Self::Error> {
        wire.data
            .into_iter()
            .map(Datum::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map(Row)
    }
}

impl TryFrom<WirePage> for Page {
    type Error = DecodeError;

    fn try_from(wire: WirePage) -> Result<Self, Self::Error> {
        let schema = wire
            .column_info
            .into_iter()
            .map(ColumnInfo::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let rows = wire
            .rows
            .into_iter()
            .map(Row::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            query_id: wire.query_id,
            next_token: wire.next_token,
            schema,
            rows,
            status: wire.query_status,
        })
    }
}

/// Parse one page from its JSON text.
pub fn page_from_json(json: &str) -> Result<Page, DecodeError> {
    let wire: WirePage = serde_json::from_str(json)
        .map_err(|e| DecodeError::malformed(format!("page json: {e}")))?;
    Page::try_from(wire)
}

// ════════════════════════════════════════════════════════════════
//  Model → wire
// ════════════════════════════════════════════════════════════════

impl From<&ColumnInfo> for WireColumnInfo {
    fn from(column: &ColumnInfo) -> Self {
        let column_type = match &column.column_type {
            ColumnType::Scalar(s) => WireType {
                scalar_type: Some(s.to_string()),
                ..Default::default()
            },
            ColumnType::Array(element) => WireType {
                array_column_info: Some(Box::new(WireColumnInfo::from(element.as_ref()))),
                ..Default::default()
            },
            ColumnType::Row(columns) => WireType {
                row_column_info: Some(columns.iter().map(WireColumnInfo::from).collect()),
                ..Default::default()
            },
            ColumnType::TimeSeries(value) => WireType {
                time_series_measure_value_column_info: Some(Box::new(WireColumnInfo::from(
                    value.as_ref(),
                ))),
                ..Default::default()
            },
        };
        WireColumnInfo {
            name: column.name.clone(),
            column_type: Some(column_type),
        }
    }
}

impl From<&Datum> for WireDatum {
    fn from(datum: &Datum) -> Self {
        match datum {
            Datum::Null => WireDatum {
                null_value: Some(true),
                ..Default::default()
            },
            Datum::Scalar(s) => WireDatum {
                scalar_value: Some(s.clone()),
                ..Default::default()
            },
            Datum::Array(items) => WireDatum {
                array_value: Some(items.iter().map(WireDatum::from).collect()),
                ..Default::default()
            },
            Datum::Row(data) => WireDatum {
                row_value: Some(WireRow {
                    data: data.iter().map(WireDatum::from).collect(),
                }),
                ..Default::default()
            },
            Datum::TimeSeries(points) => WireDatum {
                time_series_value: Some(
                    points
                        .iter()
                        .map(|p| WireTimePoint {
                            time: Some(p.time.clone()),
                            value: Some(WireDatum::from(&p.value)),
                        })
                        .collect(),
                ),
                ..Default::default()
            },
        }
    }
}

impl From<&Page> for WirePage {
    fn from(page: &Page) -> Self {
        WirePage {
            query_id: page.query_id.clone(),
            next_token: page.next_token.clone(),
            column_info: page.schema.iter().map(WireColumnInfo::from).collect(),
            rows: page
                .rows
                .iter()
                .map(|r| WireRow {
                    data: r.data().iter().map(WireDatum::from).collect(),
                })
                .collect(),
            query_status: page.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "QueryId": "q-1",
        "NextToken": "t-2",
        "ColumnInfo": [
            {"Name": "ppt_id", "Type": {"ScalarType": "VARCHAR"}},
            {"Name": "series", "Type": {"TimeSeriesMeasureValueColumnInfo": {"Type": {"ScalarType": "DOUBLE"}}}},
            {"Name": "tags", "Type": {"ArrayColumnInfo": {"Type": {"ScalarType": "VARCHAR"}}}},
            {"Name": "pos", "Type": {"RowColumnInfo": [
                {"Name": "a", "Type": {"ScalarType": "BIGINT"}},
                {"Name": "b", "Type": {"ScalarType": "BIGINT"}}
            ]}}
        ],
        "Rows": [
            {"Data": [
                {"ScalarValue": "fc096"},
                {"TimeSeriesValue": [{"Time": "2019-08-01 00:00:00.000000000", "Value": {"ScalarValue": "0.5"}}]},
                {"ArrayValue": [{"ScalarValue": "x"}, {"NullValue": true}]},
                {"RowValue": {"Data": [{"ScalarValue": "1"}, {"ScalarValue": "2"}]}}
            ]}
        ],
        "QueryStatus": {"ProgressPercentage": 100.0, "CumulativeBytesScanned": 2048, "CumulativeBytesMetered": 10000000}
    }"#;

    #[test]
    fn test_page_from_service_json() {
        let page = page_from_json(PAGE).unwrap();
        assert_eq!(page.query_id.as_deref(), Some("q-1"));
        assert_eq!(page.next_token.as_deref(), Some("t-2"));
        assert_eq!(page.schema.len(), 4);
        assert_eq!(page.bytes_scanned(), Some(2048));
        assert!(matches!(page.schema[1].column_type, ColumnType::TimeSeries(_)));
        assert!(matches!(&page.schema[3].column_type, ColumnType::Row(c) if c.len() == 2));

        let row = &page.rows[0];
        assert_eq!(row.data()[0], Datum::scalar("fc096"));
        assert_eq!(
            row.data()[2],
            Datum::Array(vec![Datum::scalar("x"), Datum::Null])
        );
        assert_eq!(
            row.data()[3],
            Datum::Row(vec![Datum::scalar("1"), Datum::scalar("2")])
        );
    }

    #[test]
    fn test_column_without_type_tag_is_malformed() {
        let wire: WireColumnInfo = serde_json::from_str(r#"{"Name": "x", "Type": {}}"#).unwrap();
        let err = ColumnInfo::try_from(wire).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedResult(_)));
    }

    #[test]
    fn test_column_with_two_type_tags_is_malformed() {
        let wire: WireColumnInfo = serde_json::from_str(
            r#"{"Name": "x", "Type": {"ScalarType": "DOUBLE", "ArrayColumnInfo": {"Type": {"ScalarType": "DOUBLE"}}}}"#,
        )
        .unwrap();
        assert!(matches!(
            ColumnInfo::try_from(wire),
            Err(DecodeError::MalformedResult(_))
        ));
    }

    #[test]
    fn test_empty_datum_is_malformed() {
        let wire: WireDatum = serde_json::from_str("{}").unwrap();
        assert!(matches!(Datum::try_from(wire), Err(DecodeError::MalformedResult(_))));
    }

    #[test]
    fn test_false_null_flag_is_not_a_tag() {
        let wire: WireDatum =
            serde_json::from_str(r#"{"ScalarValue": "1", "NullValue": false}"#).unwrap();
        assert_eq!(Datum::try_from(wire).unwrap(), Datum::scalar("1"));
    }

    #[test]
    fn test_time_point_without_value_is_malformed() {
        let wire: WireDatum =
            serde_json::from_str(r#"{"TimeSeriesValue": [{"Time": "t1"}]}"#).unwrap();
        assert!(matches!(Datum::try_from(wire), Err(DecodeError::MalformedResult(_))));
    }

    #[test]
    fn test_model_survives_wire_conversion() {
        let page = page_from_json(PAGE).unwrap();
        let json = serde_json::to_string(&WirePage::from(&page)).unwrap();
        assert_eq!(page_from_json(&json).unwrap(), page);
    }
}
