use serde::{Deserialize, Serialize};

use crate::schema::ColumnInfo;

// ════════════════════════════════════════════════════════════════
//  Datum
// ════════════════════════════════════════════════════════════════

/// One value of a result, tagged to match a [`ColumnInfo`] shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datum {
    Null,
    Scalar(String),
    Array(Vec<Datum>),
    Row(Vec<Datum>),
    TimeSeries(Vec<TimePoint>),
}

impl Datum {
    pub fn scalar(value: impl Into<String>) -> Self {
        Datum::Scalar(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Tag name as it appears on the wire, for error messages.
    pub fn tag(&self) -> &'static str {
        match self {
            Datum::Null => "NullValue",
            Datum::Scalar(_) => "ScalarValue",
            Datum::Array(_) => "ArrayValue",
            Datum::Row(_) => "RowValue",
            Datum::TimeSeries(_) => "TimeSeriesValue",
        }
    }
}

/// One point of a time series value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePoint {
    pub time: String,
    pub value: Datum,
}

impl TimePoint {
    pub fn new(time: impl Into<String>, value: Datum) -> Self {
        Self {
            time: time.into(),
            value,
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Row & Page
// ════════════════════════════════════════════════════════════════

/// Positional values of one result row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row(pub Vec<Datum>);

impl Row {
    pub fn new(data: Vec<Datum>) -> Self {
        Self(data)
    }

    pub fn data(&self) -> &[Datum] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Progress counters the service attaches to every page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryStatus {
    #[serde(default)]
    pub progress_percentage: Option<f64>,
    #[serde(default)]
    pub cumulative_bytes_scanned: Option<u64>,
    #[serde(default)]
    pub cumulative_bytes_metered: Option<u64>,
}

/// One fetch of a paginated query: schema plus rows.
///
/// Pages are handed on once and not retained by the decoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub query_id: Option<String>,
    pub next_token: Option<String>,
    pub schema: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
    pub status: Option<QueryStatus>,
}

impl Page {
    pub fn new(schema: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self {
            schema,
            rows,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn bytes_scanned(&self) -> Option<u64> {
        self.status.and_then(|s| s.cumulative_bytes_scanned)
    }
}
