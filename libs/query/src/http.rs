use aws_config::{BehaviorVersion, Region};
use aws_sdk_timestreamquery::config::http::HttpResponse;
use aws_sdk_timestreamquery::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_timestreamquery::operation::query::QueryOutput;
use aws_sdk_timestreamquery::types as sdk;
use aws_sdk_timestreamquery::Client;
use timestone_api::{
    Page, QueryStatus, WireColumnInfo, WireDatum, WirePage, WireRow, WireTimePoint, WireType,
};

use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::service::{QueryRequest, QueryService};

// ═══════════════════════════════════════════════════════════════
//  HttpQueryService
// ═══════════════════════════════════════════════════════════════

/// Query service backed by the AWS SDK client.
///
/// Credentials and region come from the default provider chain
/// (environment, shared config and credentials files, instance roles),
/// narrowed to a named profile when the config sets one.
pub struct HttpQueryService {
    client: Client,
}

impl HttpQueryService {
    pub async fn connect(config: &QueryConfig) -> Result<Self, QueryError> {
        config.validate()?;

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(profile) = &config.credential_profile {
            loader = loader.profile_name(profile.as_str());
        }
        let sdk_config = loader.load().await;

        let client = match &config.endpoint {
            Some(endpoint) => {
                let conf = aws_sdk_timestreamquery::config::Builder::from(&sdk_config)
                    .endpoint_url(normalize_endpoint(endpoint))
                    .build();
                Client::from_conf(conf)
            }
            None => {
                let (client, reload) = Client::new(&sdk_config)
                    .with_endpoint_discovery_enabled()
                    .await
                    .map_err(|e| QueryError::Sdk(format!("endpoint discovery: {e}")))?;
                tokio::spawn(reload.reload_task());
                tracing::debug!(region = %config.region, "query endpoint discovered");
                client
            }
        };
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl QueryService for HttpQueryService {
    async fn query(&self, request: &QueryRequest) -> Result<Page, QueryError> {
        let output = self
            .client
            .query()
            .query_string(&request.query_string)
            .set_next_token(request.next_token.clone())
            .set_max_rows(request.max_rows.and_then(|n| i32::try_from(n).ok()))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(Page::try_from(wire_page(&output))?)
    }

    async fn cancel_query(&self, query_id: &str) -> Result<(), QueryError> {
        self.client
            .cancel_query()
            .query_id(query_id)
            .send()
            .await
            .map_err(sdk_error)?;
        tracing::info!(query_id, "cancel requested");
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Error mapping
// ═══════════════════════════════════════════════════════════════

fn sdk_error<E>(err: SdkError<E, HttpResponse>) -> QueryError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    classify(
        status,
        err.code(),
        err.message(),
        DisplayErrorContext(&err).to_string(),
    )
}

/// Errors the service answered with become [`QueryError::Service`];
/// everything else (no credentials, dispatch or timeout) is an SDK failure.
fn classify(status: Option<u16>, code: Option<&str>, message: Option<&str>, context: String) -> QueryError {
    match (status, code) {
        (Some(status), Some(kind)) => QueryError::Service {
            status,
            kind: kind.to_string(),
            message: message.map(str::to_string).unwrap_or(context),
        },
        _ => QueryError::Sdk(context),
    }
}

// ═══════════════════════════════════════════════════════════════
//  SDK output → wire shape
// ═══════════════════════════════════════════════════════════════

/// Re-shape an SDK page into [`WirePage`] so the one "exactly one tag"
/// conversion applies to live and recorded pages alike.
fn wire_page(output: &QueryOutput) -> WirePage {
    let query_id: Option<String> = output.query_id.clone().into();
    WirePage {
        query_id,
        next_token: output.next_token().map(str::to_string),
        column_info: output.column_info().iter().map(wire_column).collect(),
        rows: output.rows().iter().map(wire_row).collect(),
        query_status: output.query_status().map(wire_status),
    }
}

fn wire_status(status: &sdk::QueryStatus) -> QueryStatus {
    let progress: Option<f64> = status.progress_percentage.into();
    let scanned: Option<i64> = status.cumulative_bytes_scanned.into();
    let metered: Option<i64> = status.cumulative_bytes_metered.into();
    QueryStatus {
        progress_percentage: progress,
        cumulative_bytes_scanned: scanned.and_then(|b| u64::try_from(b).ok()),
        cumulative_bytes_metered: metered.and_then(|b| u64::try_from(b).ok()),
    }
}

fn wire_column(column: &sdk::ColumnInfo) -> WireColumnInfo {
    WireColumnInfo {
        name: column.name().map(str::to_string),
        column_type: column.r#type().map(wire_type),
    }
}

fn wire_type(t: &sdk::Type) -> WireType {
    WireType {
        scalar_type: t.scalar_type().map(|s| s.as_str().to_string()),
        array_column_info: t.array_column_info().map(|c| Box::new(wire_column(c))),
        row_column_info: t
            .row_column_info
            .as_ref()
            .map(|columns| columns.iter().map(wire_column).collect()),
        time_series_measure_value_column_info: t
            .time_series_measure_value_column_info()
            .map(|c| Box::new(wire_column(c))),
    }
}

fn wire_row(row: &sdk::Row) -> WireRow {
    WireRow {
        data: row.data().iter().map(wire_datum).collect(),
    }
}

fn wire_datum(datum: &sdk::Datum) -> WireDatum {
    WireDatum {
        scalar_value: datum.scalar_value().map(str::to_string),
        time_series_value: datum
            .time_series_value
            .as_ref()
            .map(|points| points.iter().map(wire_point).collect()),
        array_value: datum
            .array_value
            .as_ref()
            .map(|items| items.iter().map(wire_datum).collect()),
        row_value: datum.row_value().map(wire_row),
        null_value: datum.null_value(),
    }
}

fn wire_point(point: &sdk::TimeSeriesDataPoint) -> WireTimePoint {
    let time: Option<String> = point.time.clone().into();
    WireTimePoint {
        time,
        value: point.value().map(wire_datum),
    }
}

fn normalize_endpoint(address: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("https://{address}")
    }
}
