//! Query side of timestone: configuration, the paginated query service
//! (AWS SDK client or recorded pages), page-by-page execution with
//! cancellation, CSV export and wear-time insights.

pub mod config;
pub mod error;
pub mod executor;
pub mod export;
pub mod http;
pub mod replay;
pub mod service;
pub mod wear;

pub use config::QueryConfig;
pub use error::QueryError;
pub use executor::{QueryExecutor, QueryStats};
pub use export::{csv_line, write_csv};
pub use http::HttpQueryService;
pub use replay::ReplayQueryService;
pub use service::{QueryRequest, QueryService};
