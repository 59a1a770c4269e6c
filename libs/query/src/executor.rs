use std::time::{Duration, Instant};

use timestone_api::Page;
use tokio_util::sync::CancellationToken;

use crate::error::QueryError;
use crate::service::{QueryRequest, QueryService};

const BYTES_PER_GB: f64 = 1_000_000_000.0;
const USD_PER_GB_SCANNED: f64 = 0.01;
const MIN_QUERY_COST: f64 = 0.01;

// ═══════════════════════════════════════════════════════════════
//  QueryStats
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    pub query_id: Option<String>,
    pub pages: usize,
    pub empty_pages: usize,
    pub rows: usize,
    pub elapsed: Duration,
    pub time_to_first_result: Duration,
    pub time_to_read_results: Duration,
    pub bytes_scanned: Option<u64>,
}

impl QueryStats {
    /// Scan cost in USD, rounded to a tenth of a cent, never below one cent.
    pub fn estimated_cost(&self) -> f64 {
        let gb = self.bytes_scanned.unwrap_or(0) as f64 / BYTES_PER_GB;
        let cost = (gb * USD_PER_GB_SCANNED * 1000.0).round() / 1000.0;
        cost.max(MIN_QUERY_COST)
    }

    pub fn timing_line(&self) -> String {
        format!(
            "QueryId: {} Time: {:.3}. First result: {:.3}. Time to read results: {:.3}.",
            self.query_id.as_deref().unwrap_or("-"),
            self.elapsed.as_secs_f64(),
            self.time_to_first_result.as_secs_f64(),
            self.time_to_read_results.as_secs_f64(),
        )
    }
}

// ═══════════════════════════════════════════════════════════════
//  QueryExecutor
// ═══════════════════════════════════════════════════════════════

/// Drives one paginated query at a time against a [`QueryService`].
pub struct QueryExecutor<S> {
    service: S,
    max_rows: Option<u32>,
}

impl<S: QueryService> QueryExecutor<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            max_rows: None,
        }
    }

    pub fn with_max_rows(mut self, max_rows: Option<u32>) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Fetch every page of `query`, handing non-empty pages to `on_page`.
    ///
    /// If no page carried rows, the last empty page is handed on once so the
    /// caller still sees the schema. Any failure, including `cancel` firing,
    /// cancels the query on the service side when its id is known.
    pub async fn run<F>(
        &self,
        query: &str,
        cancel: &CancellationToken,
        mut on_page: F,
    ) -> Result<QueryStats, QueryError>
    where
        F: FnMut(&Page) -> Result<(), QueryError>,
    {
        let start = Instant::now();
        let mut stats = QueryStats::default();
        let mut first_result: Option<Instant> = None;
        let mut last_empty: Option<Page> = None;
        let mut next_token: Option<String> = None;

        let outcome = loop {
            let request = QueryRequest {
                query_string: query.to_string(),
                next_token: next_token.take(),
                max_rows: self.max_rows,
            };

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(QueryError::Interrupted),
                page = self.service.query(&request) => page,
            };
            let page = match fetched {
                Ok(page) => page,
                Err(e) => break Err(e),
            };

            if stats.query_id.is_none() {
                if let Some(id) = &page.query_id {
                    tracing::info!(query_id = %id, "query started");
                    stats.query_id = Some(id.clone());
                }
            }
            stats.pages += 1;
            if let Some(bytes) = page.bytes_scanned() {
                stats.bytes_scanned = Some(bytes);
            }
            next_token = page.next_token.clone();

            if page.is_empty() {
                stats.empty_pages += 1;
                last_empty = Some(page);
            } else {
                first_result.get_or_insert_with(Instant::now);
                stats.rows += page.rows.len();
                if let Err(e) = on_page(&page) {
                    break Err(e);
                }
            }

            if next_token.is_none() {
                break Ok(());
            }
        };

        let outcome = outcome.and_then(|()| match (stats.rows, last_empty.take()) {
            (0, Some(page)) => on_page(&page),
            _ => Ok(()),
        });

        let end = Instant::now();
        stats.elapsed = end - start;
        match first_result {
            Some(first) => {
                stats.time_to_first_result = first - start;
                stats.time_to_read_results = end - first;
            }
            None => stats.time_to_first_result = stats.elapsed,
        }

        match outcome {
            Ok(()) => {
                tracing::debug!(
                    pages = stats.pages,
                    empty_pages = stats.empty_pages,
                    rows = stats.rows,
                    "query finished"
                );
                Ok(stats)
            }
            Err(e) => {
                self.cancel_after_failure(stats.query_id.as_deref(), &e).await;
                Err(e)
            }
        }
    }

    /// Fetch every page of `query` into memory.
    pub async fn collect(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<(Vec<Page>, QueryStats), QueryError> {
        let mut pages = Vec::new();
        let stats = self
            .run(query, cancel, |page| {
                pages.push(page.clone());
                Ok(())
            })
            .await?;
        Ok((pages, stats))
    }

    /// Run queries one after another; one result per query.
    ///
    /// A failed query does not stop the rest. An interrupt does: the
    /// remaining queries are not started.
    pub async fn run_all<F>(
        &self,
        queries: &[String],
        cancel: &CancellationToken,
        mut on_page: F,
    ) -> Vec<Result<QueryStats, QueryError>>
    where
        F: FnMut(usize, &Page) -> Result<(), QueryError>,
    {
        let mut results = Vec::with_capacity(queries.len());
        for (i, query) in queries.iter().enumerate() {
            tracing::info!(index = i + 1, total = queries.len(), query = %query, "running query");
            let result = self.run(query, cancel, |page| on_page(i, page)).await;
            let interrupted = matches!(result, Err(QueryError::Interrupted));
            results.push(result);
            if interrupted {
                break;
            }
        }
        results
    }

    async fn cancel_after_failure(&self, query_id: Option<&str>, cause: &QueryError) {
        let Some(query_id) = query_id else {
            return;
        };
        tracing::warn!(query_id, error = %cause, "attempting to cancel query");
        if let Err(e) = self.service.cancel_query(query_id).await {
            tracing::warn!(query_id, error = %e, "cancel failed");
        }
    }
}
