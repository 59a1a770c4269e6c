use std::future::Future;

use timestone_api::Page;

use crate::error::QueryError;

/// One page request of a paginated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query_string: String,
    pub next_token: Option<String>,
    pub max_rows: Option<u32>,
}

impl QueryRequest {
    pub fn new(query_string: impl Into<String>) -> Self {
        Self {
            query_string: query_string.into(),
            next_token: None,
            max_rows: None,
        }
    }
}

/// Paginated query execution and cancellation.
///
/// Every call fetches exactly one page; following `next_token` is up to the
/// caller (see [`crate::QueryExecutor`]).
pub trait QueryService: Send + Sync {
    fn query(&self, request: &QueryRequest) -> impl Future<Output = Result<Page, QueryError>> + Send;

    fn cancel_query(&self, query_id: &str) -> impl Future<Output = Result<(), QueryError>> + Send;
}

impl<S: QueryService> QueryService for &S {
    fn query(&self, request: &QueryRequest) -> impl Future<Output = Result<Page, QueryError>> + Send {
        (**self).query(request)
    }

    fn cancel_query(&self, query_id: &str) -> impl Future<Output = Result<(), QueryError>> + Send {
        (**self).cancel_query(query_id)
    }
}
