use std::path::Path;
use std::sync::Mutex;

use timestone_api::{Page, WirePage};

use crate::error::QueryError;
use crate::service::{QueryRequest, QueryService};

const TOKEN_PREFIX: &str = "replay-";
const DEFAULT_QUERY_ID: &str = "replay-query";

/// Serves previously recorded pages in order, whatever the query text.
///
/// Recordings are the service's own JSON: one page object or an array of
/// them. Continuation tokens are synthetic (`replay-<n>`).
pub struct ReplayQueryService {
    pages: Vec<WirePage>,
    cancelled: Mutex<Vec<String>>,
}

impl ReplayQueryService {
    pub fn new(pages: Vec<WirePage>) -> Self {
        Self {
            pages,
            cancelled: Mutex::new(Vec::new()),
        }
    }

    pub fn from_pages(pages: &[Page]) -> Self {
        Self::new(pages.iter().map(WirePage::from).collect())
    }

    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let pages = match value {
            serde_json::Value::Array(_) => serde_json::from_value::<Vec<WirePage>>(value)?,
            other => vec![serde_json::from_value::<WirePage>(other)?],
        };
        Ok(Self::new(pages))
    }

    pub fn from_file(path: &Path) -> Result<Self, QueryError> {
        let content = std::fs::read_to_string(path)?;
        let service = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), pages = service.pages.len(), "loaded recorded pages");
        Ok(service)
    }

    /// Query ids passed to `cancel_query`, in call order.
    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn index_of(token: Option<&str>) -> Result<usize, QueryError> {
        match token {
            None => Ok(0),
            Some(t) => t
                .strip_prefix(TOKEN_PREFIX)
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| QueryError::Service {
                    status: 400,
                    kind: "ValidationException".into(),
                    message: format!("unknown next token {t:?}"),
                }),
        }
    }
}

impl QueryService for ReplayQueryService {
    async fn query(&self, request: &QueryRequest) -> Result<Page, QueryError> {
        let index = Self::index_of(request.next_token.as_deref())?;
        let Some(wire) = self.pages.get(index) else {
            if index == 0 {
                return Ok(Page {
                    query_id: Some(DEFAULT_QUERY_ID.into()),
                    ..Page::default()
                });
            }
            return Err(QueryError::Service {
                status: 400,
                kind: "ValidationException".into(),
                message: format!("next token past the last recorded page ({index})"),
            });
        };

        let mut page = Page::try_from(wire.clone())?;
        if page.query_id.is_none() {
            page.query_id = Some(DEFAULT_QUERY_ID.into());
        }
        page.next_token = (index + 1 < self.pages.len()).then(|| format!("{TOKEN_PREFIX}{}", index + 1));
        Ok(page)
    }

    async fn cancel_query(&self, query_id: &str) -> Result<(), QueryError> {
        if let Ok(mut cancelled) = self.cancelled.lock() {
            cancelled.push(query_id.to_string());
        }
        tracing::info!(query_id, "cancel recorded");
        Ok(())
    }
}
