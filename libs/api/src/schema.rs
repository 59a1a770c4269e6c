use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════
//  Scalar Type
// ════════════════════════════════════════════════════════════════

/// Leaf column types reported by the query service.
///
/// Names the service does not document map to [`ScalarType::Unknown`] so a
/// new server-side type never breaks decoding of the rest of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScalarType {
    Varchar,
    Boolean,
    Bigint,
    Integer,
    Double,
    Timestamp,
    Date,
    Time,
    IntervalDayToSecond,
    IntervalYearToMonth,
    Unknown,
}

impl ScalarType {
    pub fn from_wire(name: &str) -> Self {
        match name {
            "VARCHAR" => ScalarType::Varchar,
            "BOOLEAN" => ScalarType::Boolean,
            "BIGINT" => ScalarType::Bigint,
            "INTEGER" => ScalarType::Integer,
            "DOUBLE" => ScalarType::Double,
            "TIMESTAMP" => ScalarType::Timestamp,
            "DATE" => ScalarType::Date,
            "TIME" => ScalarType::Time,
            "INTERVAL_DAY_TO_SECOND" => ScalarType::IntervalDayToSecond,
            "INTERVAL_YEAR_TO_MONTH" => ScalarType::IntervalYearToMonth,
            _ => ScalarType::Unknown,
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarType::Varchar => write!(f, "VARCHAR"),
            ScalarType::Boolean => write!(f, "BOOLEAN"),
            ScalarType::Bigint => write!(f, "BIGINT"),
            ScalarType::Integer => write!(f, "INTEGER"),
            ScalarType::Double => write!(f, "DOUBLE"),
            ScalarType::Timestamp => write!(f, "TIMESTAMP"),
            ScalarType::Date => write!(f, "DATE"),
            ScalarType::Time => write!(f, "TIME"),
            ScalarType::IntervalDayToSecond => write!(f, "INTERVAL_DAY_TO_SECOND"),
            ScalarType::IntervalYearToMonth => write!(f, "INTERVAL_YEAR_TO_MONTH"),
            ScalarType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Column Type
// ════════════════════════════════════════════════════════════════

/// Column type: exactly one of the four shapes a result column can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Scalar(ScalarType),
    /// Homogeneous sequence of one element type.
    Array(Box<ColumnInfo>),
    /// Nested record, positional.
    Row(Vec<ColumnInfo>),
    /// (time, value) pairs sharing one value type.
    TimeSeries(Box<ColumnInfo>),
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Scalar(s) => write!(f, "{s}"),
            ColumnType::Array(element) => write!(f, "ARRAY<{}>", element.column_type),
            ColumnType::Row(columns) => {
                f.write_str("ROW(")?;
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{column}")?;
                }
                f.write_str(")")
            }
            ColumnType::TimeSeries(value) => write!(f, "TIMESERIES<{}>", value.column_type),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  ColumnInfo
// ════════════════════════════════════════════════════════════════

/// One column of a result schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: Option<String>,
    pub column_type: ColumnType,
}

impl ColumnInfo {
    pub fn new(name: Option<String>, column_type: ColumnType) -> Self {
        Self { name, column_type }
    }

    /// Shortcut: named scalar column.
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(Some(name.into()), ColumnType::Scalar(scalar))
    }

    /// Shortcut: unnamed scalar, the usual element of arrays and time series.
    pub fn unnamed(scalar: ScalarType) -> Self {
        Self::new(None, ColumnType::Scalar(scalar))
    }

    pub fn array(name: Option<String>, element: ColumnInfo) -> Self {
        Self::new(name, ColumnType::Array(Box::new(element)))
    }

    pub fn row(name: Option<String>, columns: Vec<ColumnInfo>) -> Self {
        Self::new(name, ColumnType::Row(columns))
    }

    pub fn time_series(name: Option<String>, value: ColumnInfo) -> Self {
        Self::new(name, ColumnType::TimeSeries(Box::new(value)))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl std::fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} {}", self.column_type),
            None => write!(f, "{}", self.column_type),
        }
    }
}

/// Column label used where a name is mandatory (tables, records).
pub fn column_label(column: &ColumnInfo, index: usize) -> String {
    match &column.name {
        Some(name) => name.clone(),
        None => format!("col{index}"),
    }
}

/// Comma-separated description of a schema, for display only.
pub fn describe_schema(schema: &[ColumnInfo]) -> String {
    schema
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
